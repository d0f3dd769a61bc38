//! Wizard step transitions.
//!
//! ```text
//! Start → OsSelect → {MacBoot | LinuxBoot | WindowsBoot | OtherBoot}
//!       → Hardware → Drives → Sharing → Summary
//! ```
//!
//! Hardware and Drives may skip ahead depending on what the selection
//! already supplies; see [`plan_next`].

use super::step::WizardStep;
use crate::capability::{Backend, CapabilityMatrix, OsFamily};
use crate::selection::SelectionState;
use vmforge_shared::errors::ValidationError;

/// Validate `step` and compute the step after it.
///
/// Pure: nothing is mutated, so a validation failure leaves the caller's
/// state exactly as it was. `Summary` maps to itself.
pub fn plan_next(
    step: WizardStep,
    state: &SelectionState,
    matrix: &CapabilityMatrix,
) -> Result<WizardStep, ValidationError> {
    let os = state.operating_system();
    let native = state.backend() == Backend::Native;

    let next = match step {
        WizardStep::Start => WizardStep::OsSelect,
        WizardStep::OsSelect => {
            if native && !matrix.supports_os(Backend::Native, os) {
                return Err(ValidationError::NativeBackendUnsupported { os: os.to_string() });
            }
            match os {
                OsFamily::MacOs => WizardStep::MacBoot,
                OsFamily::Linux => WizardStep::LinuxBoot,
                OsFamily::Windows => WizardStep::WindowsBoot,
                OsFamily::Other => WizardStep::OtherBoot,
            }
        }
        // Resolution of the platform is started by the session, never awaited here.
        WizardStep::MacBoot => WizardStep::Hardware,
        WizardStep::LinuxBoot => {
            if state.use_kernel_boot() {
                if state.kernel().is_none() {
                    return Err(ValidationError::SelectKernel);
                }
            } else if state.boot_image().is_none() {
                return Err(ValidationError::SelectBootImage);
            }
            WizardStep::Hardware
        }
        WizardStep::WindowsBoot => {
            if state.boot_image().is_none() && state.windows_disk().is_none() {
                return Err(ValidationError::SelectWindowsMedia);
            }
            WizardStep::Hardware
        }
        WizardStep::OtherBoot => {
            if !state.skip_boot_image() && state.boot_image().is_none() {
                return Err(ValidationError::SelectBootImage);
            }
            WizardStep::Hardware
        }
        WizardStep::Hardware => {
            if CapabilityMatrix::requires_architecture_selection(native) {
                if state.architecture().is_none() {
                    return Err(ValidationError::SelectArchitecture);
                }
                if state.target().is_none() {
                    return Err(ValidationError::SelectTarget);
                }
            }
            match os {
                // A foreign-architecture disk still needs the Drives page.
                OsFamily::Windows
                    if state.windows_disk().is_some()
                        && state
                            .architecture()
                            .is_none_or(|arch| arch == matrix.host().native_architecture) =>
                {
                    WizardStep::Sharing
                }
                OsFamily::Linux if state.root_image().is_some() => {
                    if native && !matrix.has_modern_native() {
                        WizardStep::Summary
                    } else {
                        WizardStep::Sharing
                    }
                }
                _ => WizardStep::Drives,
            }
        }
        WizardStep::Drives => {
            // Native sharing exists only for Linux guests on modern hosts.
            if native && !(os == OsFamily::Linux && matrix.supports_native_sharing()) {
                WizardStep::Summary
            } else {
                WizardStep::Sharing
            }
        }
        WizardStep::Sharing => WizardStep::Summary,
        WizardStep::Summary => WizardStep::Summary,
    };

    Ok(next)
}

/// Visited-step history plus the current step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    history: Vec<WizardStep>,
    current: WizardStep,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn history(&self) -> &[WizardStep] {
        &self.history
    }

    /// Advance past the current step.
    ///
    /// On failure neither the history nor the current step change. At
    /// `Summary` this is a no-op.
    pub fn next(
        &mut self,
        state: &SelectionState,
        matrix: &CapabilityMatrix,
    ) -> Result<WizardStep, ValidationError> {
        if self.current == WizardStep::Summary {
            return Ok(self.current);
        }

        let next = plan_next(self.current, state, matrix).inspect_err(|e| {
            tracing::debug!(step = ?self.current, error = %e, "Step validation failed");
        })?;

        tracing::debug!(from = ?self.current, to = ?next, "Wizard advanced");
        self.history.push(self.current);
        self.current = next;
        Ok(next)
    }

    /// Return to the previous step; stays at `Start` when there is none.
    pub fn back(&mut self) -> WizardStep {
        self.current = self.history.pop().unwrap_or(WizardStep::Start);
        tracing::debug!(to = ?self.current, "Wizard went back");
        self.current
    }
}
