//! Drives the listing into shipping-inclusive price display.
//!
//! The page has no API for this: a price-display control has to be opened
//! and an option picked, and the only evidence that it worked is the page
//! text. The switcher runs that as an explicit state machine:
//!
//! ```text
//! Unknown ──> Switching(1) ──> ... ──> Switching(n) ──> Other
//!                  │                        │
//!                  └──────> ShippingInclusive <──┘
//! ```
//!
//! Each `Switching` attempt first checks for confirmation, then interacts,
//! then polls. A failed attempt reloads the page before the next one. Both
//! terminal states are accepted outcomes.

use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::PriceDisplayMode;
use crate::engine::wait::{poll_until, settle};
use crate::engine::RenderingEngine;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::extractor::is_free_shipping;
use crate::pipeline::listing::ListingEnumerator;
use crate::pipeline::scripts;

/// Page text that proves shipping-inclusive display is active.
pub const CONFIRMATION_MARKERS: [&str; 2] = ["表示価格：送料込みの価格", "条件指定：送料込み"];

/// Visible labels of the price-display control; which one shows varies.
pub const CONTROL_LABELS: [&str; 3] = ["表示価格", "実質価格", "本体価格"];

/// Option that selects shipping-inclusive prices.
pub const OPTION_LABEL: &str = "送料込みの価格";

/// Shown while the page still displays the other price mode.
pub const OTHER_MODE_MARKER: &str = "表示価格：実質価格";

const CONTROL_SELECTOR: &str = r#"button, div[role="button"], span"#;
const OPTION_SELECTOR: &str = "li, a, button, label";

/// States of the display-mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Unknown,
    Switching { attempt: u32 },
    ShippingInclusive,
    Other,
}

impl SwitchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwitchState::ShippingInclusive | SwitchState::Other)
    }

    pub fn mode(&self) -> PriceDisplayMode {
        match self {
            SwitchState::ShippingInclusive => PriceDisplayMode::ShippingInclusive,
            SwitchState::Other => PriceDisplayMode::Other,
            SwitchState::Unknown | SwitchState::Switching { .. } => PriceDisplayMode::Unknown,
        }
    }
}

/// Terminal result of a switch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSwitchOutcome {
    pub mode: PriceDisplayMode,
    /// Attempts started, including one that found the mode already active.
    pub attempts: u32,
    /// Control interactions performed (scripted clicks).
    pub interactions: u32,
}

impl ModeSwitchOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.mode.is_confirmed()
    }
}

enum Attempt {
    AlreadyActive,
    Confirmed,
    Unconfirmed,
}

pub fn has_confirmation_marker(body: &str) -> bool {
    CONFIRMATION_MARKERS.iter().any(|m| body.contains(m))
}

/// Looser check used while waiting for the switch to take effect.
fn looks_switched(body: &str) -> bool {
    has_confirmation_marker(body) || (body.contains(OPTION_LABEL) && !body.contains(OTHER_MODE_MARKER))
}

pub struct DisplayModeSwitcher<'a, E: RenderingEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: RenderingEngine> DisplayModeSwitcher<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Run the state machine to a terminal state. Never fails: exhausting
    /// the attempts yields the degraded [`PriceDisplayMode::Other`].
    pub async fn switch(&self) -> ModeSwitchOutcome {
        let mut state = SwitchState::Unknown;
        let mut attempts = 0;
        let mut interactions = 0;

        while !state.is_terminal() {
            state = match state {
                SwitchState::Unknown if self.config.mode_switch_attempts == 0 => SwitchState::Other,
                SwitchState::Unknown => SwitchState::Switching { attempt: 1 },
                SwitchState::Switching { attempt } => {
                    attempts = attempt;
                    match self.attempt(&mut interactions).await {
                        Ok(Attempt::AlreadyActive) => SwitchState::ShippingInclusive,
                        Ok(Attempt::Confirmed) => {
                            settle(self.config.confirmed_settle()).await;
                            SwitchState::ShippingInclusive
                        }
                        Ok(Attempt::Unconfirmed) => self.retry_after(attempt).await,
                        Err(e) => {
                            warn!("Display mode attempt {} failed: {}", attempt, e);
                            self.retry_after(attempt).await
                        }
                    }
                }
                terminal => terminal,
            };
            debug!("Display mode state: {:?}", state);
        }

        let outcome = ModeSwitchOutcome {
            mode: state.mode(),
            attempts,
            interactions,
        };
        if outcome.is_degraded() {
            warn!(
                "Shipping-inclusive display not confirmed after {} attempts; continuing degraded",
                attempts
            );
        } else {
            info!("Shipping-inclusive display active (attempt {})", attempts);
        }
        outcome
    }

    /// Reload to discard the page's transient state, then pick the next state.
    async fn retry_after(&self, attempt: u32) -> SwitchState {
        if let Err(e) = self.engine.reload().await {
            warn!("Reload after attempt {} failed: {}", attempt, e);
        }
        settle(self.config.reload_settle()).await;

        if attempt >= self.config.mode_switch_attempts {
            SwitchState::Other
        } else {
            SwitchState::Switching {
                attempt: attempt + 1,
            }
        }
    }

    async fn attempt(&self, interactions: &mut u32) -> Result<Attempt> {
        if has_confirmation_marker(&self.engine.body_text().await?) {
            return Ok(Attempt::AlreadyActive);
        }

        let open_control = scripts::click_by_label(CONTROL_SELECTOR, &CONTROL_LABELS, false);
        self.engine.execute_script(&open_control, None).await?;
        *interactions += 1;
        settle(self.config.control_settle()).await;

        let pick_option = scripts::click_by_label(OPTION_SELECTOR, &[OPTION_LABEL], false);
        self.engine.execute_script(&pick_option, None).await?;
        *interactions += 1;

        let confirmed = poll_until(self.config.confirm_timeout(), self.config.poll_interval(), || async {
            self.is_confirmed().await.then_some(())
        })
        .await;

        Ok(match confirmed {
            Some(()) => Attempt::Confirmed,
            None => Attempt::Unconfirmed,
        })
    }

    async fn is_confirmed(&self) -> bool {
        match self.engine.body_text().await {
            Ok(body) if looks_switched(&body) => return true,
            Ok(_) => {}
            Err(e) => debug!("Reading page text failed while confirming: {}", e),
        }

        // A free-shipping first listing means prices already include postage.
        ListingEnumerator::new(self.engine, self.config)
            .first_item_text()
            .await
            .is_some_and(|text| is_free_shipping(&text))
    }
}
