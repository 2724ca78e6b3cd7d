mod cookie;
mod expired;
mod log_in;
mod log_out;
mod middleware;
mod redirect;

pub(crate) use cookie::set_auth_cookie;
pub use expired::ExpiredSessions;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub(crate) use redirect::{build_log_in_redirect_url, normalize_redirect_url};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
