#![allow(missing_docs)]

pub(crate) mod backend;
pub(crate) mod fixtures;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use backend::FakeBackend;
pub(crate) use fixtures::{
    auth_cookie, logged_in_server, logged_in_server_with_state, sample_accounts,
    sample_currencies, test_server, test_state,
};
pub(crate) use form::{
    assert_form_input, assert_form_input_with_value, assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{
    assert_valid_html, parse_html_document, parse_html_document_text, parse_html_fragment,
    parse_html_fragment_text,
};
pub(crate) use http::{assert_content_type, assert_status_ok};
