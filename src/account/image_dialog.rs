//! The dialog for uploading, changing and removing an account's image.
//!
//! A selected file is first staged on the server so that the dialog can show a
//! preview. The "Upload" button then sends the staged file to the backend.
//! Closing the dialog always discards the staged file.

use axum::{
    Extension,
    extract::{FromRef, Multipart, Path, State, multipart::Field},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, Error,
    account::{
        accounts_page::accounts_changed_response,
        staging::{ImageAction, InFlightRequests, StagedImage, UploadStaging},
    },
    alert::Alert,
    api::{Account, AccountId, ApiSession},
    endpoints::{self, format_endpoint},
    html::{
        ALERT_CONTAINER, BUTTON_DANGER_STYLE, BUTTON_PRIMARY_STYLE, DIALOG_CONTAINER,
        FORM_LABEL_STYLE, dialog, loading_spinner,
    },
    query::{AccountsResource, QueryCache},
};

/// The name of the multipart field holding the image file.
const IMAGE_FIELD: &str = "image";

/// The id of the element the preview of the staged image is swapped into.
const PREVIEW_ID: &str = "image-preview";

/// The state needed for the image dialog and its endpoints.
#[derive(Debug, Clone)]
pub struct AccountImageState {
    pub cache: QueryCache,
    pub staging: UploadStaging,
    pub in_flight: InFlightRequests,
    pub max_image_bytes: usize,
}

impl FromRef<AppState> for AccountImageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cache: state.cache.clone(),
            staging: state.staging.clone(),
            in_flight: state.in_flight.clone(),
            max_image_bytes: state.config.max_image_bytes,
        }
    }
}

fn staged_preview(account_id: &AccountId, image: &StagedImage) -> Markup {
    let src = format!(
        "{}?{}",
        format_endpoint(endpoints::STAGED_ACCOUNT_IMAGE, account_id.as_str()),
        serde_urlencoded::to_string([
            ("name", image.file_name.as_str()),
            ("size", &image.bytes.len().to_string()),
        ])
        .unwrap_or_default()
    );

    html! {
        figure id=(PREVIEW_ID) class="flex flex-col items-center gap-2" data-staged-image
        {
            img src=(src) alt="Preview of the selected image" class="w-32 h-32 rounded-full object-cover";
            figcaption class="text-sm text-gray-500 dark:text-gray-400" { (image.file_name) }
        }
    }
}

fn current_image(account: &Account) -> Markup {
    html! {
        div id=(PREVIEW_ID) class="flex flex-col items-center gap-2"
        {
            @if let Some(image) = &account.image {
                img src=(image) alt="Current image" class="w-32 h-32 rounded-full object-cover" data-current-image;
            } @else {
                p class="text-sm text-gray-500 dark:text-gray-400" { "This account has no image." }
            }
        }
    }
}

fn image_dialog(account: &Account) -> Markup {
    let id = account.id.as_str();
    let staged_endpoint = format_endpoint(endpoints::STAGED_ACCOUNT_IMAGE, id);
    let image_endpoint = format_endpoint(endpoints::ACCOUNT_IMAGE, id);

    let body = html! {
        div class="space-y-4"
        {
            (current_image(account))

            form
                hx-post=(staged_endpoint)
                hx-encoding="multipart/form-data"
                hx-trigger="change"
                hx-target=(format!("#{PREVIEW_ID}"))
                hx-swap="outerHTML"
                hx-target-error=(ALERT_CONTAINER)
            {
                label for=(IMAGE_FIELD) class=(FORM_LABEL_STYLE) { "Choose an image" }
                input type="file" name=(IMAGE_FIELD) id=(IMAGE_FIELD) accept="image/*" class="block w-full text-sm";
            }

            div class="flex gap-4"
            {
                @if account.image.is_some() {
                    button
                        type="button"
                        hx-delete=(image_endpoint)
                        hx-target=(DIALOG_CONTAINER)
                        hx-target-error=(ALERT_CONTAINER)
                        hx-disabled-elt="this"
                        class=(BUTTON_DANGER_STYLE)
                    {
                        "Remove image"
                    }
                }

                button
                    type="button"
                    hx-post=(image_endpoint)
                    hx-target=(DIALOG_CONTAINER)
                    hx-target-error=(ALERT_CONTAINER)
                    hx-indicator="#indicator"
                    hx-disabled-elt="this"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                    "Upload"
                }
            }
        }
    };

    dialog("Account image", Some(&staged_endpoint), &body)
}

/// Renders the image dialog for the account with `account_id`.
///
/// Opening the dialog starts with an empty staging slot.
pub async fn get_account_image_dialog(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
) -> Response {
    state.staging.clear(session.key(), &account_id);

    match AccountsResource::new(&session, &state.cache)
        .get(&account_id)
        .await
    {
        Ok(account) => image_dialog(&account).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

async fn read_image_field(mut field: Field<'_>, max_bytes: usize) -> Result<StagedImage, Error> {
    let content_type = field.content_type().unwrap_or_default().to_owned();

    if !content_type.starts_with("image/") {
        return Err(Error::NotAnImage(content_type));
    }

    let file_name = field.file_name().unwrap_or(IMAGE_FIELD).to_owned();
    let mut bytes = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("Could not read data from multipart form field.".to_owned())
    })? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(Error::ImageTooLarge { limit: max_bytes });
        }

        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(Error::NoStagedImage);
    }

    tracing::debug!("Received image '{file_name}' that is {} bytes", bytes.len());

    Ok(StagedImage {
        file_name,
        content_type,
        bytes: bytes.into(),
    })
}

/// A route handler that puts the selected file into the dialog's staging slot.
///
/// Responds with a preview of the staged image.
pub async fn stage_account_image_endpoint(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
    mut multipart: Multipart,
) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Error::NoStagedImage.into_alert_response(),
            Err(error) => {
                tracing::error!("Could not parse multipart form: {error}");
                return Error::MultipartError(error.body_text()).into_alert_response();
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        return match read_image_field(field, state.max_image_bytes).await {
            Ok(image) => {
                let preview = staged_preview(&account_id, &image);
                state.staging.stage(session.key(), &account_id, image);
                preview.into_response()
            }
            Err(error) => error.into_alert_response(),
        };
    }
}

/// Serves the staged image for the preview.
pub async fn get_staged_account_image(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
) -> Response {
    match state.staging.get(session.key(), &account_id) {
        Some(image) => (
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, "no-store".to_owned()),
            ],
            image.bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A route handler that closes the image dialog.
///
/// The staged file is discarded whether or not anything was uploaded.
pub async fn discard_staged_account_image(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
) -> Response {
    if state.staging.clear(session.key(), &account_id) {
        tracing::debug!("Discarded the staged image for account {account_id}");
    }

    html! {}.into_response()
}

/// A route handler that uploads the staged file as the account's image.
pub async fn upload_account_image_endpoint(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
    headers: HeaderMap,
) -> Response {
    let _guard = match state
        .in_flight
        .start(session.key(), &account_id, ImageAction::Upload)
    {
        Ok(guard) => guard,
        Err(error) => return error.into_alert_response(),
    };

    let Some(image) = state.staging.get(session.key(), &account_id) else {
        return Error::NoStagedImage.into_alert_response();
    };

    let accounts = AccountsResource::new(&session, &state.cache);

    if let Err(error) = accounts.upload_image(&account_id, &image).await {
        tracing::warn!("Could not upload the image for account {account_id}: {error}");
        return error.into_alert_response();
    }

    state.staging.clear(session.key(), &account_id);

    accounts_changed_response(
        &accounts,
        &headers,
        Alert::SuccessSimple {
            message: "Image uploaded".to_owned(),
        },
    )
    .await
}

/// A route handler that removes the account's image on the backend.
pub async fn delete_account_image_endpoint(
    State(state): State<AccountImageState>,
    Extension(session): Extension<ApiSession>,
    Path(account_id): Path<AccountId>,
    headers: HeaderMap,
) -> Response {
    let _guard = match state
        .in_flight
        .start(session.key(), &account_id, ImageAction::Remove)
    {
        Ok(guard) => guard,
        Err(error) => return error.into_alert_response(),
    };

    let accounts = AccountsResource::new(&session, &state.cache);

    if let Err(error) = accounts.delete_image(&account_id).await {
        tracing::warn!("Could not remove the image for account {account_id}: {error}");
        return error.into_alert_response();
    }

    state.staging.clear(session.key(), &account_id);

    accounts_changed_response(
        &accounts,
        &headers,
        Alert::SuccessSimple {
            message: "Image removed".to_owned(),
        },
    )
    .await
}
