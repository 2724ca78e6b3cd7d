//! Alert system for displaying success and error messages to users.
//!
//! Alerts are swapped into the `#alert-container` element from [crate::html::base],
//! either as the target of a failed HTMX request (`hx-target-error`) or as an
//! out-of-band swap alongside a successful response.

use maud::{Markup, html};

/// An alert message to show in the alert container.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    fn is_error(&self) -> bool {
        matches!(self, Alert::Error { .. } | Alert::ErrorSimple { .. })
    }

    /// Render the alert on its own, for swapping into the alert container.
    pub fn into_html(self) -> Markup {
        let is_error = self.is_error();
        let (message, details) = match self {
            Alert::Error { message, details } => (message, Some(details)),
            Alert::SuccessSimple { message } | Alert::ErrorSimple { message } => (message, None),
        };
        let details = details.filter(|details| !details.is_empty());

        let container_style = if is_error {
            "flex items-start gap-3 p-4 rounded-lg shadow-lg border \
            text-red-800 bg-red-50 border-red-300 \
            dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "flex items-start gap-3 p-4 rounded-lg shadow-lg border \
            text-green-800 bg-green-50 border-green-300 \
            dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html! {
            div
                class=(container_style)
                role=(if is_error { "alert" } else { "status" })
                data-alert=(if is_error { "error" } else { "success" })
            {
                div class="flex-1"
                {
                    p class="font-medium" { (message) }

                    @if let Some(details) = details {
                        p class="mt-1 text-sm" { (details) }
                    }
                }

                button
                    type="button"
                    data-dismiss-alert
                    aria-label="Dismiss"
                    class="text-lg leading-none opacity-70 hover:opacity-100"
                {
                    "×"
                }
            }
        }
    }

    /// Render the alert wrapped in an out-of-band swap of the alert container,
    /// so that it can ride along with the main content of a response.
    pub fn into_oob_html(self) -> Markup {
        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                (self.into_html())
            }
        }
    }
}
