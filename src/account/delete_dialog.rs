//! The dialog for deleting an account and optionally moving its transactions to another account.

use axum::{
    Extension,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    account::accounts_page::{AccountsState, accounts_changed_html},
    alert::Alert,
    api::{Account, AccountId, ApiSession},
    endpoints::{self, format_endpoint},
    html::{
        ALERT_CONTAINER, BUTTON_DANGER_STYLE, DIALOG_CONTAINER, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, cancel_button, dialog, loading_spinner,
    },
    query::AccountsResource,
};

/// The request to send to the backend once the user confirms the deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub id: AccountId,
    pub replacement: Option<AccountId>,
}

/// The steps of deleting an account.
///
/// Each request rebuilds the dialog from the backend's accounts, so a value
/// lives for one request and its final state decides what is rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DeleteDialog {
    #[default]
    Closed,
    Confirming {
        target: Account,
        candidates: Vec<Account>,
        selected: Option<AccountId>,
    },
    Submitting {
        target: Account,
        candidates: Vec<Account>,
        selected: Option<AccountId>,
    },
}

impl DeleteDialog {
    /// Start deleting `target`.
    ///
    /// Every other account in `accounts` may take over the target's transactions.
    pub fn open(target: Account, accounts: &[Account]) -> Self {
        let candidates = accounts
            .iter()
            .filter(|account| account.id != target.id)
            .cloned()
            .collect();

        DeleteDialog::Confirming {
            target,
            candidates,
            selected: None,
        }
    }

    /// Choose the account that takes over the transactions, or `None` for no reassignment.
    ///
    /// Does nothing unless the dialog is waiting for confirmation.
    ///
    /// # Errors
    /// Returns [Error::InvalidReplacement] if `replacement` is not one of the candidates,
    /// which includes the account being deleted.
    pub fn select(&mut self, replacement: Option<AccountId>) -> Result<(), Error> {
        let DeleteDialog::Confirming {
            candidates,
            selected,
            ..
        } = self
        else {
            return Ok(());
        };

        if let Some(id) = &replacement {
            if !candidates.iter().any(|candidate| &candidate.id == id) {
                return Err(Error::InvalidReplacement(id.clone()));
            }
        }

        *selected = replacement;

        Ok(())
    }

    /// Submit the deletion. Returns `None` unless the dialog is waiting for confirmation.
    pub fn confirm(&mut self) -> Option<DeleteRequest> {
        match std::mem::take(self) {
            DeleteDialog::Confirming {
                target,
                candidates,
                selected,
            } => {
                let request = DeleteRequest {
                    id: target.id.clone(),
                    replacement: selected.clone(),
                };
                *self = DeleteDialog::Submitting {
                    target,
                    candidates,
                    selected,
                };

                Some(request)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// The backend deleted the account.
    pub fn succeed(&mut self) {
        if matches!(self, DeleteDialog::Submitting { .. }) {
            *self = DeleteDialog::Closed;
        }
    }

    /// The backend refused the deletion. The dialog goes back to waiting for
    /// confirmation with the same choice.
    pub fn fail(&mut self) {
        if let DeleteDialog::Submitting {
            target,
            candidates,
            selected,
        } = std::mem::take(self)
        {
            *self = DeleteDialog::Confirming {
                target,
                candidates,
                selected,
            };
        }
    }

    /// The browser cancels by dropping the dialog markup, without a request.
    #[allow(dead_code)]
    pub fn cancel(&mut self) {
        if matches!(self, DeleteDialog::Confirming { .. }) {
            *self = DeleteDialog::Closed;
        }
    }

    pub fn candidates(&self) -> &[Account] {
        match self {
            DeleteDialog::Closed => &[],
            DeleteDialog::Confirming { candidates, .. }
            | DeleteDialog::Submitting { candidates, .. } => candidates,
        }
    }

    pub fn selected(&self) -> Option<&AccountId> {
        match self {
            DeleteDialog::Closed => None,
            DeleteDialog::Confirming { selected, .. }
            | DeleteDialog::Submitting { selected, .. } => selected.as_ref(),
        }
    }

    pub fn into_html(self) -> Markup {
        let DeleteDialog::Confirming {
            target,
            candidates,
            selected,
        } = self
        else {
            return html! {};
        };

        let body = html! {
            form
                hx-delete=(format_endpoint(endpoints::ACCOUNT, target.id.as_str()))
                hx-target=(DIALOG_CONTAINER)
                hx-target-error=(ALERT_CONTAINER)
                hx-indicator="#indicator"
                hx-disabled-elt="find button[type=submit]"
                class="space-y-4"
            {
                p
                {
                    "Delete the account "
                    strong { (target.name) }
                    "? This cannot be undone."
                }

                @if !candidates.is_empty() {
                    div
                    {
                        label for="replacement_account" class=(FORM_LABEL_STYLE)
                        {
                            "Move its transactions to"
                        }
                        select
                            name="replacement_account"
                            id="replacement_account"
                            class=(FORM_TEXT_INPUT_STYLE)
                        {
                            option value="" selected[selected.is_none()] { "None" }

                            @for candidate in &candidates {
                                option
                                    value=(candidate.id.as_str())
                                    selected[selected.as_ref() == Some(&candidate.id)]
                                {
                                    (candidate.name)
                                }
                            }
                        }
                    }
                }

                div class="flex gap-4"
                {
                    (cancel_button())

                    button type="submit" class=(BUTTON_DANGER_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                        "Delete"
                    }
                }
            }
        };

        dialog("Delete account", None, &body)
    }
}

/// Renders the confirmation dialog for deleting the account with `account_id`.
pub async fn get_delete_account_dialog(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let accounts = AccountsResource::new(&session, &state.cache);
    let (target, list) = tokio::join!(accounts.get(&account_id), accounts.list());

    match target.and_then(|target| list.map(|list| (target, list))) {
        Ok((target, list)) => {
            let dialog = DeleteDialog::open(target.as_ref().clone(), &list);
            tracing::debug!(
                "Offering {} replacements for account {account_id}",
                dialog.candidates().len()
            );

            dialog.into_html().into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// An empty value means the transactions are not moved.
    pub replacement_account: Option<String>,
}

/// A route handler for deleting the account with `account_id`.
pub async fn delete_account_endpoint(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<DeleteQuery>,
    headers: HeaderMap,
) -> Response {
    let accounts = AccountsResource::new(&session, &state.cache);

    let list = match accounts.list().await {
        Ok(list) => list,
        Err(error) => return error.into_alert_response(),
    };

    let Some(target) = list.iter().find(|account| account.id == account_id) else {
        return Error::NotFound.into_alert_response();
    };

    let replacement = query
        .replacement_account
        .filter(|id| !id.trim().is_empty())
        .map(AccountId::new);

    let mut dialog = DeleteDialog::open(target.clone(), &list);

    if let Err(error) = dialog.select(replacement) {
        return error.into_alert_response();
    }

    let Some(request) = dialog.confirm() else {
        return Error::NotFound.into_alert_response();
    };
    let name = target.name.clone();

    match accounts
        .delete(&request.id, request.replacement.as_ref())
        .await
    {
        Ok(()) => {
            dialog.succeed();
            tracing::info!("Deleted account {}", request.id);

            let changed = accounts_changed_html(
                &accounts,
                &headers,
                Alert::SuccessSimple {
                    message: format!("Deleted account \"{name}\""),
                },
            )
            .await;

            // A closed dialog renders nothing, which empties the dialog container.
            html! {
                (dialog.into_html())
                (changed)
            }
            .into_response()
        }
        Err(error) => {
            dialog.fail();
            tracing::warn!(
                "Could not delete account {} with replacement {:?}: {error}",
                request.id,
                dialog.selected()
            );

            // The alert goes to the alert container and the browser keeps the
            // confirmation form, which is where `fail` leaves the dialog.
            error.into_alert_response()
        }
    }
}
