//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and never mutated afterwards; components
//! receive the pieces they need at construction time.

use crate::error::AppError;
use crate::search::Page;
use axum_extra::extract::cookie::SameSite;
use std::env;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for post-login redirects
    pub frontend_url: String,
    /// Url-safe base64 encoding of the 32-byte cookie encryption key
    pub encryption_key: String,
    pub provider: ProviderConfig,
    pub cookie: CookieConfig,
    /// Search index base URL (without the core name)
    pub search_index_url: String,
    /// Search index core holding users and listings
    pub search_index_core: String,
    /// Header a superuser can set to act as another user
    pub impersonation_header: String,
    pub page_bounds: PageBounds,
}

/// OAuth2/OIDC identity provider settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL; `/userinfo`, `/authorize` and `/oauth/*` hang off it
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the provider
    pub login_redirect: String,
    /// Interpret access tokens as JSON claims instead of calling `/userinfo`
    pub mock_userinfo: bool,
}

/// Attributes of the credentials cookie.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
    pub http_only: bool,
    pub lifetime_secs: i64,
}

/// Bounds applied to `offset`/`page_size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

impl PageBounds {
    /// Validate `offset`/`page_size` query parameters and turn them into a page.
    pub fn resolve(&self, offset: Option<i64>, page_size: Option<i64>) -> Result<Page, AppError> {
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest(
                "offset must be greater than or equal to 0".to_string(),
            ));
        }

        let limit = match page_size {
            None => self.default_page_size,
            Some(size) if size < 1 => {
                return Err(AppError::BadRequest(
                    "page_size must be greater than 0".to_string(),
                ))
            }
            Some(size) => size as u64,
        };
        if limit > self.max_page_size {
            return Err(AppError::BadRequest(format!(
                "page_size must be less than or equal to {}",
                self.max_page_size
            )));
        }

        Ok(Page {
            offset: offset as u64,
            limit,
        })
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let same_site = match env_or("AUTH_COOKIE_SAMESITE", "Lax").as_str() {
            "Strict" => SameSite::Strict,
            "Lax" => SameSite::Lax,
            "None" => SameSite::None,
            _ => return Err(ConfigError::Invalid("AUTH_COOKIE_SAMESITE")),
        };

        let page_bounds = PageBounds {
            default_page_size: parse_or("DEFAULT_PAGE_SIZE", 25)?,
            max_page_size: parse_or("MAX_PAGE_SIZE", 100)?,
        };
        if page_bounds.default_page_size == 0
            || page_bounds.default_page_size > page_bounds.max_page_size
        {
            return Err(ConfigError::Invalid("DEFAULT_PAGE_SIZE"));
        }

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env_or("FRONTEND_URL", "http://localhost:3000"),
            encryption_key: required("ENCRYPTION_KEY")?,
            provider: ProviderConfig {
                domain: required("OAUTH_DOMAIN")?.trim_end_matches('/').to_string(),
                client_id: required("OAUTH_CLIENT_ID")?,
                client_secret: required("OAUTH_CLIENT_SECRET")?,
                login_redirect: required("OAUTH_LOGIN_REDIRECT")?,
                mock_userinfo: parse_or("OAUTH_MOCK_USERINFO", false)?,
            },
            cookie: CookieConfig {
                name: env_or("AUTH_COOKIE_NAME", "credentials"),
                domain: env::var("AUTH_COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
                path: env_or("AUTH_COOKIE_PATH", "/"),
                same_site,
                secure: parse_or("AUTH_COOKIE_SECURE", true)?,
                http_only: parse_or("AUTH_COOKIE_HTTP_ONLY", true)?,
                lifetime_secs: parse_or("AUTH_COOKIE_LIFETIME_SECS", 7 * 24 * 60 * 60)?,
            },
            search_index_url: env_or("SEARCH_INDEX_URL", "http://localhost:8983/solr")
                .trim_end_matches('/')
                .to_string(),
            search_index_core: env_or("SEARCH_INDEX_CORE", "listings"),
            impersonation_header: env_or("IMPERSONATION_HEADER", "X-Mock-Session-User-Id"),
            page_bounds,
        })
    }

    /// Default config for testing only.
    ///
    /// Provider and index URLs point nowhere; tests override them with mock
    /// server addresses.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            // 32 bytes of 0x2a
            encryption_key: "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=".to_string(),
            provider: ProviderConfig {
                domain: "http://127.0.0.1:9".to_string(),
                client_id: "test_client_id".to_string(),
                client_secret: "test_client_secret".to_string(),
                login_redirect: "http://localhost:8000/users/login-callback".to_string(),
                mock_userinfo: false,
            },
            cookie: CookieConfig {
                name: "credentials".to_string(),
                domain: None,
                path: "/".to_string(),
                same_site: SameSite::Lax,
                secure: false,
                http_only: true,
                lifetime_secs: 3600,
            },
            search_index_url: "http://127.0.0.1:9/solr".to_string(),
            search_index_core: "listings".to_string(),
            impersonation_header: "X-Mock-Session-User-Id".to_string(),
            page_bounds: PageBounds::default(),
        }
    }

    /// Base URL of the configured index core.
    pub fn search_index_base(&self) -> String {
        format!("{}/{}", self.search_index_url, self.search_index_core)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
