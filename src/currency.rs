//! The page listing the currencies known to the backend.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, Error,
    api::{ApiSession, Currency},
    endpoints,
    format::{format_amount, format_timestamp},
    html::{PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base},
    navigation::NavBar,
    query::{CurrenciesResource, QueryCache},
};

/// Every currency formats this amount so that their decimal places can be compared.
const SAMPLE_AMOUNT: f64 = 1234.5;

/// The state needed for the currencies page.
#[derive(Debug, Clone)]
pub struct CurrenciesState {
    pub cache: QueryCache,
    pub local_timezone: String,
}

impl FromRef<AppState> for CurrenciesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cache: state.cache.clone(),
            local_timezone: state.config.local_timezone.clone(),
        }
    }
}

fn currency_row(currency: &Currency, local_timezone: &str) -> Markup {
    let updated_at = currency
        .audit
        .updated_at
        .or(currency.audit.created_at)
        .and_then(|timestamp| format_timestamp(timestamp, local_timezone).ok());

    html! {
        tr class=(TABLE_ROW_STYLE) data-currency-id=(currency.id.to_string())
        {
            th scope="row" class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                (currency.name)
            }
            td class=(TABLE_CELL_STYLE) { (currency.symbol.as_deref().unwrap_or("-")) }
            td class=(TABLE_CELL_STYLE)
            {
                @match currency.decimal_places {
                    Some(places) => { (places) }
                    None => { "-" }
                }
            }
            td class=(TABLE_CELL_STYLE) data-sample-amount { (format_amount(SAMPLE_AMOUNT, currency)) }
            td class=(TABLE_CELL_STYLE) { (updated_at.unwrap_or_default()) }
        }
    }
}

fn currencies_view(currencies: &[Currency], local_timezone: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::CURRENCIES_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Currencies" }

                div class="w-full overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Symbol" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Decimal places" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Example" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Last updated" }
                            }
                        }

                        tbody
                        {
                            @for currency in currencies {
                                (currency_row(currency, local_timezone))
                            }

                            @if currencies.is_empty() {
                                tr
                                {
                                    td colspan="5" class="px-6 py-4 text-center"
                                    {
                                        "No currencies found."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Currencies", &content)
}

/// Renders the currencies page.
pub async fn get_currencies_page(
    State(state): State<CurrenciesState>,
    Extension(session): Extension<ApiSession>,
) -> Result<Response, Error> {
    let currencies = CurrenciesResource::new(&session, &state.cache)
        .list()
        .await
        .inspect_err(|error| tracing::error!("could not get the currencies: {error}"))?;

    Ok(currencies_view(&currencies, &state.local_timezone).into_response())
}
