mod accounts_page;
mod delete_dialog;
mod form;
mod form_dialog;
mod image_dialog;
mod staging;

pub use accounts_page::get_accounts_page;
pub use delete_dialog::{delete_account_endpoint, get_delete_account_dialog};
pub use form_dialog::{
    create_account_endpoint, get_edit_account_dialog, get_new_account_dialog,
    update_account_endpoint,
};
pub use image_dialog::{
    delete_account_image_endpoint, discard_staged_account_image, get_account_image_dialog,
    get_staged_account_image, stage_account_image_endpoint, upload_account_image_endpoint,
};
pub use staging::{InFlightRequests, StagedImage, UploadStaging};
