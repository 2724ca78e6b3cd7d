//! Displays the accounts as a table on wide screens and as cards on narrow ones.

use std::cmp::Ordering;

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    api::{Account, ApiSession},
    endpoints::{self, format_endpoint},
    format::{avatar_initial, date_attr, format_date},
    html::{
        BADGE_STYLE, BUTTON_DELETE_STYLE, BUTTON_LINK_STYLE, DIALOG_CONTAINER, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    query::{AccountsResource, QueryCache},
};

/// The id of the element holding the accounts table and cards.
const ACCOUNTS_SECTION_ID: &str = "accounts";

/// The state needed for the account pages, dialogs and mutations.
#[derive(Debug, Clone)]
pub struct AccountsState {
    pub cache: QueryCache,
}

impl FromRef<AppState> for AccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cache: state.cache.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    Type,
}

impl SortField {
    fn as_str(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Type => "type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// The raw sort parameters from the query string.
///
/// Kept as strings so that an unknown value falls back to the default
/// instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// How the accounts list is ordered. Defaults to name ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountSort {
    pub field: SortField,
    pub order: SortOrder,
}

fn compare_names(a: &Account, b: &Account) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

impl AccountSort {
    pub fn from_query(query: &SortQuery) -> Self {
        let field = match query.sort.as_deref() {
            Some("type") => SortField::Type,
            _ => SortField::Name,
        };
        let order = match query.order.as_deref() {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        };

        Self { field, order }
    }

    /// Read the sort order of the page that sent an HTMX request.
    ///
    /// Used when a dialog refreshes the list so that the list keeps its order.
    pub fn from_current_url(headers: &HeaderMap) -> Self {
        let query = headers
            .get("hx-current-url")
            .and_then(|header| header.to_str().ok())
            .and_then(|url| url.parse::<Uri>().ok())
            .and_then(|uri| uri.query().map(str::to_owned))
            .and_then(|query| serde_urlencoded::from_str::<SortQuery>(&query).ok())
            .unwrap_or_default();

        Self::from_query(&query)
    }

    /// Sort `accounts`. Names are compared case-insensitively.
    pub fn apply<'a>(&self, accounts: &'a [Account]) -> Vec<&'a Account> {
        let mut sorted: Vec<&Account> = accounts.iter().collect();

        sorted.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::Name => compare_names(a, b),
                SortField::Type => a.kind.cmp(&b.kind).then_with(|| compare_names(a, b)),
            };

            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        sorted
    }

    /// The link for a column header. Clicking the current sort column flips the order.
    fn href(&self, field: SortField) -> String {
        let order = if self.field == field {
            self.order.reversed()
        } else {
            SortOrder::Asc
        };

        format!(
            "{}?sort={}&order={}",
            endpoints::ACCOUNTS_VIEW,
            field.as_str(),
            order.as_str()
        )
    }

    fn indicator(&self, field: SortField) -> &'static str {
        match (self.field == field, self.order) {
            (false, _) => "",
            (true, SortOrder::Asc) => " ▲",
            (true, SortOrder::Desc) => " ▼",
        }
    }
}

fn avatar(account: &Account) -> Markup {
    html! {
        @if let Some(image) = &account.image {
            img
                src=(image)
                alt=""
                class="w-8 h-8 rounded-full object-cover shrink-0"
                data-account-avatar="image";
        } @else {
            span
                class="inline-flex items-center justify-center w-8 h-8 shrink-0 rounded-full
                    bg-blue-100 text-blue-800 font-semibold dark:bg-blue-900 dark:text-blue-200"
                aria-hidden="true"
                data-account-avatar="initial"
            {
                (avatar_initial(&account.name))
            }
        }
    }
}

fn action_buttons(account: &Account) -> Markup {
    let id = account.id.as_str();
    let image_label = if account.image.is_some() {
        "Change image"
    } else {
        "Upload image"
    };

    html! {
        button
            type="button"
            hx-get=(format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, id))
            hx-target=(DIALOG_CONTAINER)
            class=(BUTTON_LINK_STYLE)
        { "Edit" }

        button
            type="button"
            hx-get=(format_endpoint(endpoints::ACCOUNT_IMAGE_VIEW, id))
            hx-target=(DIALOG_CONTAINER)
            class=(BUTTON_LINK_STYLE)
        { (image_label) }

        button
            type="button"
            hx-get=(format_endpoint(endpoints::DELETE_ACCOUNT_VIEW, id))
            hx-target=(DIALOG_CONTAINER)
            class=(BUTTON_DELETE_STYLE)
        { "Delete" }
    }
}

fn opened_on(account: &Account) -> Markup {
    html!(
        @if let Some(opened) = account.opening_date {
            p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
            {
                "Opened "
                time datetime=(date_attr(opened)) { (format_date(opened)) }
            }
        }
    )
}

fn table_row(account: &Account) -> Markup {
    html!(
        tr class=(TABLE_ROW_STYLE) data-account-id=(account.id.as_str())
        {
            th
                scope="row"
                class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                div class="flex items-center gap-3"
                {
                    (avatar(account))
                    span { (account.name) }
                }
            }

            td class=(TABLE_CELL_STYLE)
            {
                span class=(BADGE_STYLE) { (account.kind.label()) }
            }

            td class=(TABLE_CELL_STYLE)
            {
                (account.description.as_deref().unwrap_or_default())
                (opened_on(account))
            }

            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4" { (action_buttons(account)) }
            }
        }
    )
}

fn accounts_cards_view(accounts: &[&Account]) -> Markup {
    html!(
        ul class="lg:hidden space-y-4"
        {
            @for account in accounts {
                li class="rounded border border-gray-200 bg-white px-4 py-3 shadow-sm dark:border-gray-700 dark:bg-gray-800"
                    data-account-card="true"
                {
                    div class="flex items-center justify-between gap-3"
                    {
                        div class="flex items-center gap-3 text-sm font-semibold text-gray-900 dark:text-white"
                        {
                            (avatar(account))
                            span { (account.name) }
                        }
                        span class=(BADGE_STYLE) { (account.kind.label()) }
                    }

                    @if let Some(description) = &account.description {
                        p class="mt-1 text-xs text-gray-500 dark:text-gray-400" { (description) }
                    }
                    (opened_on(account))

                    div class="mt-2 flex items-center gap-4 text-sm"
                    {
                        (action_buttons(account))
                    }
                }
            }

            @if accounts.is_empty() {
                li class="rounded border border-dashed border-gray-300 bg-white px-4 py-6 text-center text-sm text-gray-500 dark:border-gray-700 dark:bg-gray-800 dark:text-gray-400"
                {
                    "No accounts found."
                }
            }
        }
    )
}

/// The table and cards for `accounts`.
///
/// With `oob` set the section replaces the one on the page as an out-of-band swap.
fn accounts_section(accounts: &[&Account], sort: AccountSort, oob: bool) -> Markup {
    html!(
        section
            id=(ACCOUNTS_SECTION_ID)
            class="w-full space-y-4"
            hx-swap-oob=[oob.then_some("true")]
        {
            (accounts_cards_view(accounts))

            div class="hidden lg:block w-full overflow-x-auto lg:overflow-visible dark:bg-gray-800 lg:max-w-5xl lg:w-full lg:mx-auto"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                a href=(sort.href(SortField::Name)) { "Name" (sort.indicator(SortField::Name)) }
                            }
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                a href=(sort.href(SortField::Type)) { "Type" (sort.indicator(SortField::Type)) }
                            }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for account in accounts {
                            (table_row(account))
                        }

                        @if accounts.is_empty() {
                            tr
                            {
                                td
                                    colspan="4"
                                    class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                {
                                    "No accounts found."
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn accounts_view(accounts: &[Account], sort: AccountSort) -> Markup {
    let nav_bar = NavBar::new(endpoints::ACCOUNTS_VIEW).into_html();
    let sorted = sort.apply(accounts);

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Accounts" }

                    button
                        type="button"
                        hx-get=(endpoints::NEW_ACCOUNT_VIEW)
                        hx-target=(DIALOG_CONTAINER)
                        class=(LINK_STYLE)
                    {
                        "Add Account"
                    }
                }

                (accounts_section(&sorted, sort, false))
            }
        }
    );

    base("Accounts", &content)
}

/// Renders the accounts page showing all accounts.
pub async fn get_accounts_page(
    State(state): State<AccountsState>,
    Extension(session): Extension<ApiSession>,
    Query(query): Query<SortQuery>,
) -> Result<Response, Error> {
    let accounts = AccountsResource::new(&session, &state.cache)
        .list()
        .await
        .inspect_err(|error| tracing::error!("could not get all accounts: {error}"))?;

    Ok(accounts_view(&accounts, AccountSort::from_query(&query)).into_response())
}

/// The response to a successful change of an account made from a dialog.
///
/// The response body is empty, which closes the dialog. The accounts list is
/// fetched again and swapped in out of band, keeping the sort order of the
/// page, and `alert` is shown.
pub(crate) async fn accounts_changed_response(
    accounts: &AccountsResource<'_>,
    headers: &HeaderMap,
    alert: Alert,
) -> Response {
    accounts_changed_html(accounts, headers, alert)
        .await
        .into_response()
}

/// The out-of-band accounts section and alert of [accounts_changed_response].
pub(crate) async fn accounts_changed_html(
    accounts: &AccountsResource<'_>,
    headers: &HeaderMap,
    alert: Alert,
) -> Markup {
    let sort = AccountSort::from_current_url(headers);

    let refreshed = match accounts.list().await {
        Ok(list) => Some(accounts_section(&sort.apply(&list), sort, true)),
        Err(error) => {
            tracing::error!("Could not refresh the accounts after a change: {error}");
            None
        }
    };

    html! {
        @if let Some(section) = refreshed {
            (section)
        }

        (alert.into_oob_html())
    }
}

#[cfg(test)]
mod sort_tests {
    use axum::http::{HeaderMap, HeaderValue};

    use crate::{api::AccountType, test_utils::sample_accounts};

    use super::{AccountSort, SortField, SortOrder, SortQuery};

    fn names(sort: AccountSort) -> Vec<String> {
        let mut accounts = sample_accounts();
        accounts[0].name = "zebra savings".to_owned();
        accounts[1].name = "Apple shares".to_owned();
        accounts[2].name = "mortgage".to_owned();

        sort.apply(&accounts)
            .into_iter()
            .map(|account| account.name.clone())
            .collect()
    }

    #[test]
    fn default_sort_is_name_ascending_ignoring_case() {
        assert_eq!(
            names(AccountSort::default()),
            ["Apple shares", "mortgage", "zebra savings"]
        );
    }

    #[test]
    fn name_descending() {
        let sort = AccountSort {
            field: SortField::Name,
            order: SortOrder::Desc,
        };

        assert_eq!(names(sort), ["zebra savings", "mortgage", "Apple shares"]);
    }

    #[test]
    fn type_sort_groups_by_type() {
        let sort = AccountSort {
            field: SortField::Type,
            order: SortOrder::Asc,
        };
        let accounts = sample_accounts();

        let kinds: Vec<AccountType> = sort
            .apply(&accounts)
            .into_iter()
            .map(|account| account.kind)
            .collect();

        let mut want = kinds.clone();
        want.sort();
        assert_eq!(kinds, want);
    }

    #[test]
    fn unknown_query_values_fall_back_to_default() {
        let sort = AccountSort::from_query(&SortQuery {
            sort: Some("balance".to_owned()),
            order: Some("sideways".to_owned()),
        });

        assert_eq!(sort, AccountSort::default());
    }

    #[test]
    fn reads_sort_from_current_url() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "hx-current-url",
            HeaderValue::from_static("http://localhost:3000/accounts?sort=type&order=desc"),
        );

        assert_eq!(
            AccountSort::from_current_url(&headers),
            AccountSort {
                field: SortField::Type,
                order: SortOrder::Desc,
            }
        );
        assert_eq!(
            AccountSort::from_current_url(&HeaderMap::new()),
            AccountSort::default()
        );
    }
}

#[cfg(test)]
mod accounts_view_tests {
    use scraper::{Html, Selector};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{assert_valid_html, sample_accounts},
    };

    use super::{AccountSort, accounts_view};

    #[test]
    fn table_and_cards_list_every_account() {
        let accounts = sample_accounts();

        let html = Html::parse_document(&accounts_view(&accounts, AccountSort::default()).into_string());

        assert_valid_html(&html);
        let rows = html.select(&Selector::parse("table tbody tr").unwrap()).count();
        let cards = html
            .select(&Selector::parse("li[data-account-card]").unwrap())
            .count();
        assert_eq!(rows, accounts.len());
        assert_eq!(cards, accounts.len());
    }

    #[test]
    fn rows_have_edit_image_and_delete_actions() {
        let accounts = sample_accounts();

        let html = Html::parse_document(&accounts_view(&accounts, AccountSort::default()).into_string());

        for account in &accounts {
            let id = account.id.as_str();
            let row_selector = Selector::parse(&format!("tr[data-account-id='{id}'] button")).unwrap();
            let targets: Vec<&str> = html
                .select(&row_selector)
                .filter_map(|button| button.value().attr("hx-get"))
                .collect();

            assert_eq!(
                targets,
                [
                    format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, id),
                    format_endpoint(endpoints::ACCOUNT_IMAGE_VIEW, id),
                    format_endpoint(endpoints::DELETE_ACCOUNT_VIEW, id),
                ]
            );
        }
    }

    #[test]
    fn avatar_uses_image_or_initial() {
        let mut accounts = sample_accounts();
        accounts[0].image = Some("https://img.example/a.png".to_owned());
        accounts[1].image = None;
        accounts[1].name = "éclair".to_owned();

        let html = Html::parse_document(&accounts_view(&accounts, AccountSort::default()).into_string());

        let image_selector = Selector::parse(&format!(
            "tr[data-account-id='{}'] img[data-account-avatar='image']",
            accounts[0].id
        ))
        .unwrap();
        assert_eq!(html.select(&image_selector).count(), 1);
        let initial_selector = Selector::parse(&format!(
            "tr[data-account-id='{}'] [data-account-avatar='initial']",
            accounts[1].id
        ))
        .unwrap();
        let initial: String = html
            .select(&initial_selector)
            .next()
            .unwrap()
            .text()
            .collect();
        assert_eq!(initial.trim(), "É");
    }

    #[test]
    fn opening_date_is_shown_when_known() {
        let accounts = sample_accounts();

        let html = Html::parse_document(&accounts_view(&accounts, AccountSort::default()).into_string());

        let opened: Vec<String> = html
            .select(&Selector::parse("time[datetime='2024-04-01']").unwrap())
            .map(|time| time.text().collect())
            .collect();
        assert_eq!(opened, ["1 Apr 2024", "1 Apr 2024"]);
        assert_eq!(html.select(&Selector::parse("time").unwrap()).count(), 2);
    }

    #[test]
    fn empty_list_shows_message() {
        let html = Html::parse_document(&accounts_view(&[], AccountSort::default()).into_string());

        assert_valid_html(&html);
        let cell = html
            .select(&Selector::parse("td[colspan='4']").unwrap())
            .next()
            .expect("want a no data message");
        assert!(cell.text().collect::<String>().contains("No accounts found."));
    }
}
