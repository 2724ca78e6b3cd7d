//! The dialog for creating and editing accounts, and the endpoints it submits to.

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Error,
    account::{
        accounts_page::{AccountsState, accounts_changed_response},
        form::{AccountFormData, FieldErrors},
    },
    alert::Alert,
    api::{Account, AccountId, AccountType, ApiSession},
    endpoints::{self, format_endpoint},
    html::{
        ALERT_CONTAINER, BUTTON_PRIMARY_STYLE, DIALOG_CONTAINER, FORM_CHECKBOX_STYLE,
        FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, cancel_button, dialog,
        loading_spinner,
    },
    query::AccountsResource,
};

/// Which account the form dialog is for.
#[derive(Debug, Clone, PartialEq)]
enum FormTarget {
    Create,
    Edit(AccountId),
}

/// The account form dialog with its values, messages and section state.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountFormDialog {
    target: FormTarget,
    values: AccountFormData,
    errors: FieldErrors,
    advanced_open: bool,
    bank_info_open: bool,
}

impl AccountFormDialog {
    /// A blank form for a new account with every section collapsed.
    pub fn create() -> Self {
        Self {
            target: FormTarget::Create,
            values: AccountFormData {
                kind: AccountType::Asset.as_str().to_owned(),
                ..Default::default()
            },
            errors: FieldErrors::default(),
            advanced_open: false,
            bank_info_open: false,
        }
    }

    /// A form filled from `account`.
    ///
    /// A section starts expanded only if one of its fields has a value.
    pub fn edit(account: &Account) -> Self {
        let values = AccountFormData::from_account(account);

        Self {
            target: FormTarget::Edit(account.id.clone()),
            advanced_open: values.has_advanced_values(),
            bank_info_open: values.has_bank_info_values(),
            values,
            errors: FieldErrors::default(),
        }
    }

    /// The form as submitted, shown again with `errors`.
    fn invalid(target: FormTarget, values: AccountFormData, errors: FieldErrors) -> Self {
        let date_error = errors.opening_date.is_some()
            || errors.closing_date.is_some()
            || errors.ignore_unprocessed_before.is_some();

        Self {
            target,
            advanced_open: values.has_advanced_values() || date_error,
            bank_info_open: values.has_bank_info_values(),
            values,
            errors,
        }
    }

    pub fn is_advanced_open(&self) -> bool {
        self.advanced_open
    }

    pub fn is_bank_info_open(&self) -> bool {
        self.bank_info_open
    }

    pub fn values(&self) -> &AccountFormData {
        &self.values
    }

    pub fn into_html(self) -> Markup {
        let (title, submit_label) = match &self.target {
            FormTarget::Create => ("New account", "Create account"),
            FormTarget::Edit(_) => ("Edit account", "Save changes"),
        };
        let (hx_post, hx_put) = match &self.target {
            FormTarget::Create => (Some(endpoints::ACCOUNTS_API.to_owned()), None),
            FormTarget::Edit(id) => (None, Some(format_endpoint(endpoints::ACCOUNT, id.as_str()))),
        };
        let values = &self.values;
        let errors = &self.errors;

        let body = html! {
            form
                hx-post=[hx_post]
                hx-put=[hx_put]
                hx-target=(DIALOG_CONTAINER)
                hx-target-error=(ALERT_CONTAINER)
                hx-indicator="#indicator"
                hx-disabled-elt="find button[type=submit]"
                class="space-y-4"
                novalidate
            {
                div
                {
                    label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                    input
                        type="text"
                        name="name"
                        id="name"
                        required
                        autofocus
                        value=(values.name)
                        class=(FORM_TEXT_INPUT_STYLE);
                    (field_error(errors.name.as_deref()))
                }

                div
                {
                    label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                    select name="type" id="type" required class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for kind in AccountType::ALL {
                            option value=(kind.as_str()) selected[values.kind == kind.as_str()]
                            {
                                (kind.label())
                            }
                        }
                    }
                    (field_error(errors.kind.as_deref()))
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                    textarea name="description" id="description" rows="2" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        (values.description)
                    }
                }

                div class="flex items-center gap-x-3"
                {
                    input
                        type="checkbox"
                        name="show_in_dashboard_summary"
                        id="show_in_dashboard_summary"
                        checked[values.show_in_dashboard_summary.is_some()]
                        class=(FORM_CHECKBOX_STYLE);
                    label for="show_in_dashboard_summary" class="text-sm" { "Show in dashboard summary" }
                }

                div class="flex items-center gap-x-3"
                {
                    input
                        type="checkbox"
                        name="hide_from_reports"
                        id="hide_from_reports"
                        checked[values.hide_from_reports.is_some()]
                        class=(FORM_CHECKBOX_STYLE);
                    label for="hide_from_reports" class="text-sm" { "Hide from reports" }
                }

                details id="bank-info-section" open[self.bank_info_open] class="space-y-4"
                {
                    summary class="cursor-pointer text-sm font-medium" { "Bank info" }

                    div
                    {
                        label for="bank_account_id" class=(FORM_LABEL_STYLE) { "Bank account ID" }
                        input
                            type="text"
                            name="bank_account_id"
                            id="bank_account_id"
                            value=(values.bank_account_id)
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="bank_id" class=(FORM_LABEL_STYLE) { "Bank ID" }
                        input
                            type="text"
                            name="bank_id"
                            id="bank_id"
                            value=(values.bank_id)
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                details id="advanced-section" open[self.advanced_open] class="space-y-4"
                {
                    summary class="cursor-pointer text-sm font-medium" { "Advanced" }

                    (date_input("opening_date", "Opening date", &values.opening_date, errors.opening_date.as_deref()))
                    (date_input("closing_date", "Closing date", &values.closing_date, errors.closing_date.as_deref()))
                    (date_input(
                        "ignore_unprocessed_before",
                        "Ignore unprocessed transactions before",
                        &values.ignore_unprocessed_before,
                        errors.ignore_unprocessed_before.as_deref(),
                    ))
                }

                div class="flex gap-4"
                {
                    (cancel_button())

                    button type="submit" class=(BUTTON_PRIMARY_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                        (submit_label)
                    }
                }
            }
        };

        dialog(title, None, &body)
    }
}

fn field_error(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message {
            p class=(FORM_ERROR_STYLE) { (message) }
        }
    }
}

fn date_input(name: &str, label: &str, value: &str, error: Option<&str>) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input type="date" name=(name) id=(name) value=(value) class=(FORM_TEXT_INPUT_STYLE);
            (field_error(error))
        }
    }
}

fn account_not_found_dialog() -> Markup {
    dialog(
        "Edit account",
        None,
        &html! {
            p class="mb-4" data-empty-state
            {
                "This account could not be found. It may have been deleted."
            }
            (cancel_button())
        },
    )
}

/// Renders the dialog for creating an account.
pub async fn get_new_account_dialog() -> Response {
    AccountFormDialog::create().into_html().into_response()
}

/// Renders the dialog for editing the account with `account_id`.
///
/// An account that no longer exists gets a "not found" message instead of the form.
pub async fn get_edit_account_dialog(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
) -> Response {
    match AccountsResource::new(&session, &state.cache)
        .get(&account_id)
        .await
    {
        Ok(account) => AccountFormDialog::edit(&account).into_html().into_response(),
        Err(Error::NotFound) => account_not_found_dialog().into_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for creating a new account.
///
/// An invalid form is shown again with messages and nothing is sent to the backend.
pub async fn create_account_endpoint(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    headers: HeaderMap,
    Form(form): Form<AccountFormData>,
) -> Response {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => {
            return AccountFormDialog::invalid(FormTarget::Create, form, errors)
                .into_html()
                .into_response();
        }
    };

    let accounts = AccountsResource::new(&session, &state.cache);

    if let Err(error) = accounts.create(&payload).await {
        tracing::warn!("Could not create account \"{}\": {error}", payload.name);
        return error.into_alert_response();
    }

    accounts_changed_response(
        &accounts,
        &headers,
        Alert::SuccessSimple {
            message: format!("Created account \"{}\"", payload.name),
        },
    )
    .await
}

/// A route handler for updating the account with `account_id`.
pub async fn update_account_endpoint(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
    headers: HeaderMap,
    Form(form): Form<AccountFormData>,
) -> Response {
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => {
            return AccountFormDialog::invalid(FormTarget::Edit(account_id), form, errors)
                .into_html()
                .into_response();
        }
    };

    let accounts = AccountsResource::new(&session, &state.cache);

    if let Err(error) = accounts.update(&account_id, &payload).await {
        tracing::warn!("Could not update account {account_id}: {error}");
        return error.into_alert_response();
    }

    accounts_changed_response(
        &accounts,
        &headers,
        Alert::SuccessSimple {
            message: format!("Saved account \"{}\"", payload.name),
        },
    )
    .await
}
