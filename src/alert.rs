//! Headless alert presenter.

use crate::core::{AlertPresenter, AlertSpec, ButtonStyle, PressCallback};

/// Logs each alert and answers it with its cancel button, or dismisses it
/// when there is none. Nothing destructive is ever pressed.
#[derive(Debug, Default)]
pub struct LogAlertPresenter;

impl AlertPresenter for LogAlertPresenter {
    fn present(&self, alert: AlertSpec, on_press: PressCallback) {
        let buttons: Vec<&str> = alert.buttons.iter().map(|(text, _)| text.as_str()).collect();
        tracing::info!(title = %alert.title, message = %alert.message, ?buttons, "alert");
        let cancel = alert
            .buttons
            .iter()
            .position(|(_, style)| *style == ButtonStyle::Cancel);
        on_press(cancel);
    }
}
