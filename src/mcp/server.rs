use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

use lru::LruCache;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParams,
        ProtocolVersion, RawResource, ReadResourceRequestParams, ReadResourceResult, Resource,
        ResourceContents, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use crate::config::types::BookingConfig;
use crate::domain::availability::{conflicts, free_units, resolve_minimum_stay};
use crate::domain::booking::{BookingQuote, BookingRequest, BookingSnapshot, validate_booking};
use crate::domain::date_range::{parse_day, parse_stay};
use crate::domain::pricing::{price_stay, resolve_rate};
use crate::error::BookingError;
use crate::ports::booking_store::BookingStore;
use crate::ports::rate_limiter::RateLimiter;

const ANONYMOUS_REQUESTER: &str = "anonymous";
const MAX_QUOTE_RESOURCES: NonZeroUsize = NonZeroUsize::new(256).unwrap();

// ---------- Resource Store ----------

/// Most recent quotes, exposed as MCP resources.
/// Keys are URIs like `cottage://quote/lakeside/2025-07-01/2025-07-05/4`.
/// Once full, the least recently written or read quote is dropped.
#[derive(Clone)]
pub struct ResourceStore {
    entries: Arc<RwLock<LruCache<String, ResourceEntry>>>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::with_capacity(MAX_QUOTE_RESOURCES)
    }
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl ResourceStore {
    fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.write().await.put(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.write().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct NightlyRateToolParams {
    /// Night to price (YYYY-MM-DD)
    pub date: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PriceStayToolParams {
    /// Arrival date (YYYY-MM-DD)
    pub checkin: String,
    /// Departure date (YYYY-MM-DD), not a paid night
    pub checkout: String,
    /// Number of guests, at least 1
    pub occupants: u32,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UnitStayToolParams {
    /// Unit ID from cottage_list_units
    pub unit_id: String,
    /// Arrival date (YYYY-MM-DD)
    pub checkin: String,
    /// Departure date (YYYY-MM-DD)
    pub checkout: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct FindUnitsToolParams {
    /// Arrival date (YYYY-MM-DD)
    pub checkin: String,
    /// Departure date (YYYY-MM-DD)
    pub checkout: String,
    /// Number of guests. When set, the stay price is included.
    pub occupants: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QuoteBookingToolParams {
    /// Unit ID from cottage_list_units
    pub unit_id: String,
    /// Arrival date (YYYY-MM-DD)
    pub checkin: String,
    /// Departure date (YYYY-MM-DD)
    pub checkout: String,
    /// Number of guests, at least 1
    pub occupants: u32,
    /// Caller identity used for rate limiting (client IP or account id).
    /// Supplied by the caller and not verified; requests without one share a single "anonymous" budget.
    pub requester: Option<String>,
    /// Admin only: quote even if the dates clash with a booking or block
    pub override_conflicts: Option<bool>,
}

// ---------- MCP Server ----------

#[derive(Clone)]
pub struct CottageMcpServer {
    store: Arc<dyn BookingStore>,
    limiter: Arc<dyn RateLimiter>,
    booking: BookingConfig,
    tool_router: ToolRouter<Self>,
    resources: ResourceStore,
}

/// One resource per distinct quote: dates, guest count and whether conflicts
/// were overridden all change the quoted text.
fn quote_uri(quote: &BookingQuote) -> String {
    let mut uri = format!(
        "cottage://quote/{}/{}/{}/{}",
        quote.unit_id,
        quote.range.start(),
        quote.range.end(),
        quote.occupants
    );
    if !quote.overridden_conflicts.is_empty() {
        uri.push_str("/override");
    }
    uri
}

fn failure(context: &str, e: &BookingError) -> CallToolResult {
    let hint = match e {
        BookingError::UnitUnavailable { .. } => {
            " Use cottage_find_available_units to see which cottages are free for these dates."
        }
        BookingError::StayTooShort { .. } => " Extend the stay or choose another arrival date.",
        BookingError::PriceOverflow { .. } => " Shorten the stay or reduce the number of guests.",
        BookingError::UnitNotFound { .. } => " Use cottage_list_units to get valid unit IDs.",
        BookingError::InvalidDate { .. } | BookingError::InvalidRange { .. } => {
            " Dates must be YYYY-MM-DD with checkout after checkin."
        }
        _ => "",
    };
    CallToolResult::error(vec![Content::text(format!("{context}: {e}.{hint}"))])
}

#[tool_router]
impl CottageMcpServer {
    pub fn new(
        store: Arc<dyn BookingStore>,
        limiter: Arc<dyn RateLimiter>,
        booking: BookingConfig,
    ) -> Self {
        Self {
            store,
            limiter,
            booking,
            tool_router: Self::tool_router(),
            resources: ResourceStore::default(),
        }
    }

    /// Read the unit's data and run the full booking validation.
    async fn quote(&self, params: &QuoteBookingToolParams) -> crate::error::Result<BookingQuote> {
        let requester = params.requester.as_deref().unwrap_or(ANONYMOUS_REQUESTER);
        if !self.limiter.try_consume(requester) {
            return Err(BookingError::RateLimited);
        }

        let request = BookingRequest {
            unit_id: params.unit_id.clone(),
            range: parse_stay(&params.checkin, &params.checkout)?,
            occupants: params.occupants,
            override_conflicts: params.override_conflicts.unwrap_or(false),
        };
        let pricing = self.store.pricing().await?;
        let occupancies = self.store.occupancies(&request.unit_id).await?;
        let rules = self.store.minimum_stay_rules(&request.unit_id).await?;
        let snapshot = BookingSnapshot {
            pricing: &pricing,
            occupancies: &occupancies,
            rules: &rules,
            default_min_nights: self.booking.default_min_nights,
        };
        validate_booking(&snapshot, &request)
    }

    /// List the cottages that can be booked.
    #[tool(
        name = "cottage_list_units",
        description = "List the bookable cottages with their IDs. Start here to get unit IDs for the other tools.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_list_units(&self) -> Result<CallToolResult, McpError> {
        match self.store.units().await {
            Ok(units) => {
                let mut text = String::new();
                if units.is_empty() {
                    text.push_str("No units configured.\n");
                } else {
                    let _ = writeln!(text, "{} units:", units.len());
                    for unit in &units {
                        let _ = writeln!(text, "- {} (ID: {})", unit.name, unit.id);
                    }
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to list units", &e)),
        }
    }

    /// Nightly rate and season for one date.
    #[tool(
        name = "cottage_nightly_rate",
        description = "Get the nightly rate for a single date and the season it falls in. Dates outside every season use the base rate.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_nightly_rate(
        &self,
        Parameters(params): Parameters<NightlyRateToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let date = parse_day(&params.date)?;
            let pricing = self.store.pricing().await?;
            let rate = resolve_rate(&pricing, date);
            Ok::<_, BookingError>(format!(
                "{date}: {} per night ({} season pricing, up to {} guests)",
                rate.rate, rate.season_name, pricing.base_occupancy
            ))
        }
        .await;

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(failure(
                &format!("Failed to get nightly rate for '{}'", params.date),
                &e,
            )),
        }
    }

    /// Price a stay without checking any unit's availability.
    #[tool(
        name = "cottage_price_stay",
        description = "Price a stay by season: nights per season, extra-guest surcharge and total. Does not check availability; use cottage_quote_booking for a bookable quote.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_price_stay(
        &self,
        Parameters(params): Parameters<PriceStayToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let range = parse_stay(&params.checkin, &params.checkout)?;
            let pricing = self.store.pricing().await?;
            price_stay(&pricing, &range, params.occupants)
        }
        .await;

        match result {
            Ok(priced) => Ok(CallToolResult::success(vec![Content::text(
                priced.to_string(),
            )])),
            Err(e) => Ok(failure("Failed to price stay", &e)),
        }
    }

    /// Whether a unit is free for a range, and what it clashes with if not.
    #[tool(
        name = "cottage_check_availability",
        description = "Check whether a cottage is free for the given dates. Checkout and check-in on the same day do not clash. Lists conflicting bookings and blocks when the unit is taken.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_check_availability(
        &self,
        Parameters(params): Parameters<UnitStayToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let range = parse_stay(&params.checkin, &params.checkout)?;
            let occupancies = self.store.occupancies(&params.unit_id).await?;
            let mut text = String::new();
            let clashes = conflicts(&occupancies, &params.unit_id, &range);
            if clashes.is_empty() {
                let _ = write!(text, "Unit {} is available for {range}.", params.unit_id);
            } else {
                let _ = writeln!(
                    text,
                    "Unit {} is not available for {range}. Conflicts:",
                    params.unit_id
                );
                for clash in clashes {
                    let _ = write!(text, "- {} {}", clash.kind, clash.range);
                    if let Some(ref reference) = clash.reference {
                        let _ = write!(text, " ({reference})");
                    }
                    text.push('\n');
                }
            }
            Ok::<_, BookingError>(text)
        }
        .await;

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(failure(
                &format!("Failed to check availability for unit '{}'", params.unit_id),
                &e,
            )),
        }
    }

    /// Minimum nights in force for an arrival date.
    #[tool(
        name = "cottage_minimum_stay",
        description = "Get the minimum number of nights required for a stay at a cottage, based on the arrival date, and whether the requested stay meets it.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_minimum_stay(
        &self,
        Parameters(params): Parameters<UnitStayToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let range = parse_stay(&params.checkin, &params.checkout)?;
            let rules = self.store.minimum_stay_rules(&params.unit_id).await?;
            let min_nights = resolve_minimum_stay(
                &rules,
                &params.unit_id,
                &range,
                self.booking.default_min_nights,
            );
            let nights = range.nights();
            let verdict = if nights >= min_nights {
                "meets"
            } else {
                "is below"
            };
            Ok::<_, BookingError>(format!(
                "Minimum stay for unit {} arriving {}: {min_nights} nights. The requested {nights} nights {verdict} the minimum.",
                params.unit_id,
                range.start()
            ))
        }
        .await;

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(failure(
                &format!("Failed to get minimum stay for unit '{}'", params.unit_id),
                &e,
            )),
        }
    }

    /// Units free for a range.
    #[tool(
        name = "cottage_find_available_units",
        description = "Find every cottage that is free for the given dates. Optionally include the stay price for a number of guests.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_find_available_units(
        &self,
        Parameters(params): Parameters<FindUnitsToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let range = parse_stay(&params.checkin, &params.checkout)?;
            let units = self.store.units().await?;
            let mut occupancies = Vec::new();
            for unit in &units {
                occupancies.extend(self.store.occupancies(&unit.id).await?);
            }
            let ids: Vec<String> = units.iter().map(|u| u.id.clone()).collect();
            let free = free_units(&occupancies, &ids, &range);

            let mut text = String::new();
            if free.is_empty() {
                let _ = writeln!(text, "No units available for {range}.");
            } else {
                let _ = writeln!(text, "{} of {} units available for {range}:", free.len(), units.len());
                for id in &free {
                    let name = units
                        .iter()
                        .find(|u| u.id == *id)
                        .map_or(*id, |u| u.name.as_str());
                    let _ = writeln!(text, "- {name} (ID: {id})");
                }
                if let Some(occupants) = params.occupants {
                    let pricing = self.store.pricing().await?;
                    let priced = price_stay(&pricing, &range, occupants)?;
                    let _ = writeln!(
                        text,
                        "\nPrice for {occupants} guests: {} ({} nights)",
                        priced.total_price, priced.nights
                    );
                }
            }
            Ok::<_, BookingError>(text)
        }
        .await;

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(failure("Failed to search available units", &e)),
        }
    }

    /// Validate and price a booking request.
    #[tool(
        name = "cottage_quote_booking",
        description = "Validate a booking request for one cottage and return a priced quote. Rejects dates that clash with existing bookings or blocks and stays shorter than the minimum in force on the arrival date. Rate limited per `requester` value; calls without a requester share one budget.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn cottage_quote_booking(
        &self,
        Parameters(params): Parameters<QuoteBookingToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.quote(&params).await {
            Ok(quote) => {
                let text = quote.to_string();
                let uri = quote_uri(&quote);
                let name = format!(
                    "Quote: {} {} for {} guests",
                    quote.unit_id, quote.range, quote.occupants
                );
                self.resources.insert(uri, name, text.clone()).await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(
                &format!("Booking request for unit '{}' rejected", params.unit_id),
                &e,
            )),
        }
    }
}

#[tool_handler]
impl ServerHandler for CottageMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Cottage booking server: seasonal pricing, availability and minimum-stay checks.\n\
                 \n\
                 ## Tools\n\
                 Start with cottage_list_units to get unit IDs.\n\
                 - cottage_nightly_rate: rate and season for one night\n\
                 - cottage_price_stay: per-season price breakdown for a stay and guest count\n\
                 - cottage_check_availability: whether a unit is free, with conflicting bookings/blocks\n\
                 - cottage_minimum_stay: minimum nights in force for an arrival date\n\
                 - cottage_find_available_units: every unit free for a date range\n\
                 - cottage_quote_booking: full validation and priced quote for one unit\n\
                 \n\
                 ## Dates\n\
                 Dates are YYYY-MM-DD. Checkout is not a paid night, and a checkout and a check-in \
                 on the same day do not clash.\n\
                 \n\
                 ## Resources\n\
                 The most recent quotes are kept as resources at \
                 cottage://quote/{unit}/{checkin}/{checkout}/{occupants}, with /override appended \
                 when conflicts were overridden.\n\
                 \n\
                 ## Rate limiting\n\
                 cottage_quote_booking is limited per `requester` value. The value is not verified, \
                 and calls without one share a single budget."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
