//! Call registry
//!
//! The authoritative, insertion-ordered set of live calls. Call-manager
//! relative positions (`nth_at`) and `+CLCC` numbering both follow this
//! order.

use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_core::{Call, CallDirection, CallStatus, Properties};

#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: Vec<Call>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call described by its oFono property dictionary.
    ///
    /// Returns `Ok(None)` without touching the existing entry when `path` is
    /// already known, and an error (with nothing registered) when a known
    /// property has the wrong type.
    pub fn upsert(
        &mut self,
        path: &str,
        manager: &str,
        properties: &Properties,
    ) -> Result<Option<&Call>> {
        if self.find(path).is_some() {
            debug!("Ignoring duplicate call {}", path);
            return Ok(None);
        }

        let call = call_from_properties(path, manager, properties)?;
        self.calls.push(call);
        Ok(self.calls.last())
    }

    /// Detach a call. Finalization side effects are the dispatcher's job.
    pub fn remove(&mut self, path: &str) -> Option<Call> {
        let idx = self.calls.iter().position(|c| c.path == path)?;
        Some(self.calls.remove(idx))
    }

    /// Detach every call, oldest first
    pub fn clear(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn find(&self, path: &str) -> Option<&Call> {
        self.calls.iter().find(|c| c.path == path)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Call> {
        self.calls.iter_mut().find(|c| c.path == path)
    }

    pub fn find_by_status(&self, status: CallStatus) -> Option<&Call> {
        self.calls.iter().find(|c| c.status == status)
    }

    pub fn find_by_status_at(&self, manager: &str, status: CallStatus) -> Option<&Call> {
        self.calls
            .iter()
            .find(|c| c.manager == manager && c.status == status)
    }

    /// First call whose status differs from `status`
    pub fn find_without_status(&self, status: CallStatus) -> Option<&Call> {
        self.calls.iter().find(|c| c.status != status)
    }

    /// Zero-based `n`th call belonging to `manager`
    pub fn nth_at(&self, manager: &str, n: usize) -> Option<&Call> {
        self.calls.iter().filter(|c| c.manager == manager).nth(n)
    }

    /// Most recently registered call
    pub fn newest(&self) -> Option<&Call> {
        self.calls.last()
    }

    /// The call queued to be answered once another call disconnects
    pub fn waiting_for_answer(&self) -> Option<&Call> {
        self.calls.iter().find(|c| c.waiting_for_answer)
    }

    /// Paths of `manager`'s calls in `status`
    pub fn paths_with_status_at(&self, manager: &str, status: CallStatus) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.manager == manager && c.status == status)
            .map(|c| c.path.clone())
            .collect()
    }

    pub fn mark_all_pending(&mut self, manager: &str) {
        for call in self.calls.iter_mut().filter(|c| c.manager == manager) {
            call.status_pending = true;
        }
    }

    pub fn clear_pending(&mut self, path: &str) {
        if let Some(call) = self.find_mut(path) {
            call.status_pending = false;
        }
    }

    pub fn clear_pending_at(&mut self, manager: &str) {
        for call in self.calls.iter_mut().filter(|c| c.manager == manager) {
            call.status_pending = false;
        }
    }

    pub fn any_pending(&self) -> bool {
        self.calls.iter().any(|c| c.status_pending)
    }

    pub fn statuses(&self) -> impl Iterator<Item = CallStatus> + '_ {
        self.calls.iter().map(|c| c.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Build a call from the `CallAdded` / `GetCalls` property dictionary.
///
/// A missing `State` leaves the call Active.
pub fn call_from_properties(path: &str, manager: &str, properties: &Properties) -> Result<Call> {
    let mut call = Call::new(path, manager);

    for (name, value) in properties {
        match name.as_str() {
            "LineIdentification" => {
                let number = expect_str(name, value)?;
                if !number.is_empty() {
                    call.number = Some(number.to_string());
                }
            }
            "State" => {
                let state = expect_str(name, value)?;
                call.status = CallStatus::from_ofono(state)
                    .ok_or_else(|| Error::protocol(format!("unknown call state '{}'", state)))?;
            }
            "Multiparty" => {
                call.conference = value
                    .as_bool()
                    .ok_or_else(|| Error::protocol("Multiparty is not a boolean"))?;
            }
            _ => {}
        }
    }

    call.direction = match call.status {
        CallStatus::Dialing | CallStatus::Alerting => CallDirection::Originating,
        _ => CallDirection::Terminating,
    };

    Ok(call)
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::protocol(format!("{} is not a string", name)))
}
