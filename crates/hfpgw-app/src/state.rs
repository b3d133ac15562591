//! Gateway state (Model in TEA pattern)

use hfpgw_core::{
    chld_capabilities, AgFeatures, AgSuppFeatures, HfpEvent, IndicatorTable, ModemState,
    NetworkState,
};
use hfpgw_modem::CommandSender;

use crate::config::Settings;
use crate::registry::CallRegistry;

/// Lifecycle of the gateway process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayPhase {
    #[default]
    Running,
    Quitting,
}

/// Everything the dispatcher and call control engine read and write.
///
/// Owned by the engine and only touched from its message loop.
#[derive(Debug)]
pub struct AppState {
    pub phase: GatewayPhase,

    pub registry: CallRegistry,
    pub modem: ModemState,
    pub network: NetworkState,
    pub indicators: IndicatorTable,

    pub features: AgFeatures,
    pub supp_features: AgSuppFeatures,

    /// AT+CMER reporting switch for `+CIEV` updates
    pub events_enabled: bool,

    /// Number of the most recent outgoing call
    pub last_dialed_number: Option<String>,

    pub settings: Settings,
    pub sender: CommandSender,

    /// Events produced while handling the current message
    outbox: Vec<HfpEvent>,
}

impl AppState {
    pub fn new(settings: Settings, sender: CommandSender) -> Self {
        Self {
            phase: GatewayPhase::default(),
            registry: CallRegistry::new(),
            modem: ModemState::default(),
            network: NetworkState::default(),
            indicators: IndicatorTable::new(),
            features: AgFeatures::with_disabled(settings.features.disabled),
            supp_features: AgSuppFeatures::with_disabled(settings.features.disabled_supplementary),
            events_enabled: false,
            last_dialed_number: None,
            settings,
            sender,
            outbox: Vec::new(),
        }
    }

    /// Queue an event for the HFP layer
    pub fn emit(&mut self, event: HfpEvent) {
        self.outbox.push(event);
    }

    /// Drain queued events in emission order
    pub fn take_events(&mut self) -> Vec<HfpEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Path of the modem used for call control, if any
    pub fn active_manager(&self) -> Option<String> {
        self.modem.active_path().map(str::to_string)
    }

    /// Whether notifications from `manager` should be accepted
    pub fn is_active_manager(&self, manager: &str) -> bool {
        self.modem.active_path() == Some(manager)
    }

    pub fn chld_capabilities(&self) -> &'static str {
        chld_capabilities(self.features, self.supp_features)
    }

    /// The indicator-ready announcement sent once at startup
    pub fn ready_event(&self) -> HfpEvent {
        HfpEvent::Ready {
            features: self.features.bits(),
            supp_features: self.supp_features.bits(),
            indicators: self.indicators.describe(),
            chld: self.chld_capabilities().to_string(),
        }
    }

    pub fn should_quit(&self) -> bool {
        self.phase == GatewayPhase::Quitting
    }
}
