//! Directory scraper.
//!
//! Drives a headless Chrome session over WebDriver against a directory search
//! page and turns each result card into a [`CompanyCandidate`]. Scraping is
//! best-effort: load failures and timeouts produce an empty list, and a card
//! that cannot be read is skipped without affecting its siblings.

use crate::config::Config;
use crate::domain::normalize_domain;
use crate::errors::AppError;
use crate::models::{CompanyCandidate, SearchQuery};
use async_trait::async_trait;
use futures::FutureExt;
use scraper::{ElementRef, Html, Selector};
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

/// Value stored for card fields that are missing from the listing.
pub const NOT_AVAILABLE: &str = "N/A";

const RESULTS_SELECTOR: &str = ".search-results.organic";
const CARD_SELECTOR: &str = ".v-card";
const WEBSITE_SELECTOR: &str = ".links a.track-visit-website";
const NAME_SELECTOR: &str = ".business-name span";
const PHONE_SELECTOR: &str = ".phones";
const STREET_SELECTOR: &str = ".street-address";
const LOCALITY_SELECTOR: &str = ".locality";

const RESULTS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Source of company listings for a search.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Returns the companies listed for `query`. Never fails; an unreachable
    /// directory yields an empty list.
    async fn search(&self, query: &SearchQuery) -> Vec<CompanyCandidate>;
}

/// Yellow Pages search-results scraper backed by a WebDriver server.
pub struct YellowPagesScraper {
    webdriver_url: String,
    base_url: String,
    results_timeout: Duration,
}

impl YellowPagesScraper {
    pub fn new(webdriver_url: String, base_url: String, results_timeout: Duration) -> Self {
        Self {
            webdriver_url,
            base_url,
            results_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.webdriver_url.clone(),
            config.directory_base_url.clone(),
            Duration::from_secs(config.scrape_timeout_secs),
        )
    }

    /// Builds the search URL with both terms percent-encoded.
    pub fn search_url(&self, query: &SearchQuery) -> Result<url::Url, AppError> {
        url::Url::parse_with_params(
            &format!("{}/search", self.base_url.trim_end_matches('/')),
            &[
                ("search_terms", query.industry.as_str()),
                ("geo_location_terms", query.location.as_str()),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build search URL: {}", e)))
    }

    /// Starts a fresh headless browser session. Sessions are never shared
    /// between searches.
    async fn open_session(&self) -> WebDriverResult<WebDriver> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;

        WebDriver::new(self.webdriver_url.as_str(), caps).await
    }

    /// Loads the results page and returns the outer HTML of every result card.
    ///
    /// Each card is read independently so one stale element only loses that card.
    async fn collect_cards(
        &self,
        driver: &WebDriver,
        url: &url::Url,
    ) -> WebDriverResult<Vec<WebDriverResult<String>>> {
        driver.goto(url.as_str()).await?;

        if let Err(e) = driver
            .query(By::Css(RESULTS_SELECTOR))
            .wait(self.results_timeout, RESULTS_POLL_INTERVAL)
            .first()
            .await
        {
            tracing::warn!(
                "No results container within {:?} for {}: {}",
                self.results_timeout,
                url,
                e
            );
            return Ok(Vec::new());
        }

        let cards = driver.find_all(By::Css(CARD_SELECTOR)).await?;
        tracing::debug!("Found {} result cards", cards.len());

        let mut html = Vec::with_capacity(cards.len());
        for card in cards {
            html.push(card.outer_html().await);
        }

        Ok(html)
    }
}

#[async_trait]
impl DirectorySource for YellowPagesScraper {
    async fn search(&self, query: &SearchQuery) -> Vec<CompanyCandidate> {
        let url = match self.search_url(query) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping directory search: {}", e);
                return Vec::new();
            }
        };

        tracing::info!(
            "Scraping directory for industry='{}' location='{}'",
            query.industry,
            query.location
        );

        let driver = match self.open_session().await {
            Ok(driver) => driver,
            Err(e) => {
                tracing::warn!("Failed to start browser session: {}", e);
                return Vec::new();
            }
        };

        let outcome = AssertUnwindSafe(self.collect_cards(&driver, &url))
            .catch_unwind()
            .await;

        // The session is released whatever happened above.
        if let Err(e) = driver.quit().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        match outcome {
            Ok(Ok(cards)) => {
                let candidates = extract_candidates(cards);
                tracing::info!("Scraped {} companies from {}", candidates.len(), url);
                candidates
            }
            Ok(Err(e)) => {
                tracing::warn!("Scraping failed for {}: {}", url, e);
                Vec::new()
            }
            Err(_) => {
                tracing::error!("Scraping panicked for {}", url);
                Vec::new()
            }
        }
    }
}

/// Parses every readable card, skipping (and logging) the ones that fail.
pub fn extract_candidates<E, I>(cards: I) -> Vec<CompanyCandidate>
where
    E: Display,
    I: IntoIterator<Item = Result<String, E>>,
{
    cards
        .into_iter()
        .enumerate()
        .filter_map(|(index, card)| match card {
            Ok(html) => match parse_card(&html) {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!("Error parsing card {}: {}", index + 1, e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Error reading card {}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

/// Extracts one company from a result card's HTML.
///
/// Returns `Ok(None)` for cards that have no usable website link; text fields
/// that are missing fall back to [`NOT_AVAILABLE`].
pub fn parse_card(html: &str) -> Result<Option<CompanyCandidate>, AppError> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();

    let website_url = match root
        .select(&selector(WEBSITE_SELECTOR)?)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
    {
        Some(href) => href.to_string(),
        None => return Ok(None),
    };

    let domain = normalize_domain(&website_url);
    if domain.is_empty() {
        tracing::debug!("Dropping card with unusable website '{}'", website_url);
        return Ok(None);
    }

    let company_name = text_or_default(root, NAME_SELECTOR)?;
    let contact_phone = text_or_default(root, PHONE_SELECTOR)?;
    let street = text_or_default(root, STREET_SELECTOR)?;
    let locality = text_or_default(root, LOCALITY_SELECTOR)?;

    Ok(Some(CompanyCandidate {
        company_name,
        contact_phone,
        location: format!("{} {}", street, locality),
        website_url,
        domain,
    }))
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::InternalError(format!("Invalid selector '{}': {:?}", css, e)))
}

fn text_or_default(root: ElementRef<'_>, css: &str) -> Result<String, AppError> {
    let text = root
        .select(&selector(css)?)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty());

    Ok(text.unwrap_or_else(|| NOT_AVAILABLE.to_string()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, website: Option<&str>) -> String {
        let link = website
            .map(|href| {
                format!(
                    r#"<div class="links"><a class="track-visit-website" href="{}">Website</a></div>"#,
                    href
                )
            })
            .unwrap_or_default();
        format!(
            r#"<div class="v-card">
                <a class="business-name" href="/biz"><span>{}</span></a>
                <div class="phones phone primary">(555) 010-2000</div>
                <div class="adr">
                    <div class="street-address">12 Main St</div>
                    <div class="locality">Austin,
                        TX 78701</div>
                </div>
                {}
            </div>"#,
            name, link
        )
    }

    #[test]
    fn test_parse_full_card() {
        let candidate = parse_card(&card("Acme Plumbing", Some("https://www.acmeplumbing.com/")))
            .unwrap()
            .unwrap();

        assert_eq!(candidate.company_name, "Acme Plumbing");
        assert_eq!(candidate.contact_phone, "(555) 010-2000");
        assert_eq!(candidate.location, "12 Main St Austin, TX 78701");
        assert_eq!(candidate.website_url, "https://www.acmeplumbing.com/");
        assert_eq!(candidate.domain, "acmeplumbing.com");
    }

    #[test]
    fn test_card_without_website_is_dropped() {
        assert_eq!(parse_card(&card("No Site LLC", None)).unwrap(), None);
    }

    #[test]
    fn test_card_with_unparseable_website_is_dropped() {
        assert_eq!(parse_card(&card("Odd LLC", Some("/redirect?x=1"))).unwrap(), None);
    }

    #[test]
    fn test_missing_fields_default_to_not_available() {
        let html = r#"<div class="v-card">
            <div class="links"><a class="track-visit-website" href="https://bare.io">Website</a></div>
        </div>"#;
        let candidate = parse_card(html).unwrap().unwrap();

        assert_eq!(candidate.company_name, NOT_AVAILABLE);
        assert_eq!(candidate.contact_phone, NOT_AVAILABLE);
        assert_eq!(candidate.location, "N/A N/A");
        assert_eq!(candidate.domain, "bare.io");
    }

    #[test]
    fn test_one_unreadable_card_does_not_abort_batch() {
        let cards: Vec<Result<String, String>> = vec![
            Ok(card("One", Some("https://one.com"))),
            Ok(card("Two", Some("https://two.com"))),
            Err("stale element reference".to_string()),
            Ok(card("Four", Some("https://four.com"))),
            Ok(card("Five", Some("https://five.com"))),
        ];

        let candidates = extract_candidates(cards);
        let names: Vec<&str> = candidates.iter().map(|c| c.company_name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two", "Four", "Five"]);
    }

    #[test]
    fn test_search_url_encodes_terms() {
        let scraper = YellowPagesScraper::new(
            "http://localhost:4444".to_string(),
            "https://www.yellowpages.com/".to_string(),
            Duration::from_secs(12),
        );
        let url = scraper
            .search_url(&SearchQuery {
                industry: "HVAC & Plumbing".to_string(),
                location: "Austin, TX".to_string(),
            })
            .unwrap();

        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("search_terms".to_string(), "HVAC & Plumbing".to_string()),
                ("geo_location_terms".to_string(), "Austin, TX".to_string()),
            ]
        );
        assert!(!url.as_str().contains(' '));
        assert!(url.as_str().contains("HVAC+%26+Plumbing"));
    }
}
