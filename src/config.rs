use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::Level;

use crate::identity::Strictness;

const DEFAULT_ARXIV_KEYWORDS: &[&str] = &[
    "quantitative finance",
    "factor model",
    "portfolio optimization",
    "deep learning trading",
    "market microstructure",
    "risk premia",
    "machine learning trading",
    "reinforcement learning trading",
    "algorithm trading",
];

const DEFAULT_REPORT_BROKERS: &[&str] = &[
    "中信建投",
    "华泰证券",
    "天风证券",
    "兴业证券",
    "国泰君安",
    "招商证券",
    "中金公司",
    "申万宏源",
    "海通证券",
    "广发证券",
];

const DEFAULT_REPORT_KEYWORDS: &[&str] = &[
    "金工",
    "量化",
    "因子",
    "选股",
    "择时",
    "资产配置",
    "深度研究",
    "基本面量化",
    "多因子",
    "机器学习",
    "神经网络",
    "高频",
];

const DEFAULT_BRIEFING_FEEDS: &str = "Reuters_Business=https://feeds.reuters.com/reuters/businessNews,\
Reuters_Tech=https://feeds.reuters.com/reuters/technologyNews,\
WSJ_Market=https://feeds.a.dj.com/rss/RSSMarketsMain.xml,\
FT_World=https://www.ft.com/?format=rss,\
Caixin_Biz=https://www.caixinglobal.com/upload/rss/business_xml.xml,\
Yahoo_Finance=https://finance.yahoo.com/news/rssindex,\
Seeking_Alpha=https://seekingalpha.com/market_currents.xml";

/// A century; wider windows overflow date arithmetic.
const MAX_RSS_AGE_HOURS: i64 = 24 * 365 * 100;

const DEFAULT_SCHOLAR_QUERIES: &[&str] =
    &[r#"quantitative finance "machine learning" trading after:2024"#];

/// Startup configuration faults. These are the only errors that stop a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Quota and threshold knobs for the curation engine.
#[derive(Debug, Clone)]
pub struct CurationConfig {
    pub min_score: f64,
    pub final_save_count: usize,
    /// Unseen candidates requested from a deep-scanning source.
    pub candidate_pool_size: usize,
    /// Hard ceiling on raw provider items examined by a deep scan.
    pub max_search_depth: usize,
    pub strictness: Strictness,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            min_score: 5.0,
            final_save_count: 15,
            candidate_pool_size: 30,
            max_search_depth: 200,
            strictness: Strictness::Trim,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub archive_file: String,
    pub max_history_size: usize,
    pub max_report_size: usize,
}

#[derive(Debug, Clone)]
pub struct ArxivConfig {
    pub keywords: Vec<String>,
    /// Category prefix every accepted entry must carry, e.g. `q-fin`.
    pub category: String,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct ScholarConfig {
    pub api_key: Option<String>,
    pub queries: Vec<String>,
    pub results_per_query: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct RssConfig {
    pub feeds: Vec<FeedConfig>,
    pub max_age_hours: i64,
}

/// Sell-side research reports from the Eastmoney report list.
#[derive(Debug, Clone)]
pub struct ReportsConfig {
    pub enabled: bool,
    pub api_url: String,
    /// Eastmoney report class: 0 stock, 1 industry, 2 strategy, 3 macro.
    pub report_type: u8,
    /// Only reports issued by these brokers are kept (exact name match).
    pub brokers: Vec<String>,
    /// A kept report's title contains at least one of these.
    pub keywords: Vec<String>,
    /// Days back from the run date to list reports for.
    pub lookback_days: i64,
    /// Raw rows requested from the list endpoint.
    pub page_size: usize,
    /// Reports handed on after filtering.
    pub max_results: usize,
}

/// The daily market briefing run mode.
#[derive(Debug, Clone)]
pub struct BriefingConfig {
    pub feeds: Vec<FeedConfig>,
    pub max_age_hours: i64,
    /// Headlines given to the LLM.
    pub max_headlines: usize,
    /// Headlines listed under the briefing in the email.
    pub email_headlines: usize,
}

/// What a process invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Score new papers and reports, persist, send digests.
    #[default]
    Curate,
    /// Summarize the last day's headlines into one LLM-written briefing.
    Briefing,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curate" => Ok(RunMode::Curate),
            "briefing" => Ok(RunMode::Briefing),
            other => Err(format!("expected `curate` or `briefing`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub fallback_score: f64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub user: String,
    pub pass: String,
    pub to: String,
    pub smtp_host: String,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub push_threshold: f64,
    pub highlight_score: f64,
    pub push_limit: usize,
    pub email_item_limit: usize,
    pub dingtalk_webhook: Option<String>,
    pub discord_webhook: Option<String>,
    pub email: Option<EmailConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            push_threshold: 6.0,
            highlight_score: 8.0,
            push_limit: 5,
            email_item_limit: 50,
            dingtalk_webhook: None,
            discord_webhook: None,
            email: None,
        }
    }
}

/// Immutable process configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: RunMode,
    pub curation: CurationConfig,
    pub store: StoreConfig,
    pub arxiv: ArxivConfig,
    pub scholar: ScholarConfig,
    pub rss: RssConfig,
    pub reports: ReportsConfig,
    pub briefing: BriefingConfig,
    pub oracle: OracleConfig,
    pub notify: NotifyConfig,
    pub dry_run: bool,
}

impl Config {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let curation_defaults = CurationConfig::default();
        let notify_defaults = NotifyConfig::default();

        let curation = CurationConfig {
            min_score: vars.parse("MIN_SCORE", curation_defaults.min_score)?,
            final_save_count: vars.parse("FINAL_SAVE_COUNT", curation_defaults.final_save_count)?,
            candidate_pool_size: vars
                .parse("CANDIDATE_POOL_SIZE", curation_defaults.candidate_pool_size)?,
            max_search_depth: vars.parse("MAX_SEARCH_DEPTH", curation_defaults.max_search_depth)?,
            strictness: vars.parse("IDENTITY_NORMALIZATION", curation_defaults.strictness)?,
        };
        at_least("FINAL_SAVE_COUNT", curation.final_save_count, 1)?;

        let store = StoreConfig {
            data_dir: PathBuf::from(vars.string("DATA_DIR", "data")),
            ledger_file: vars.string("LEDGER_FILE", "seen.json"),
            archive_file: vars.string("ARCHIVE_FILE", "reports.json"),
            max_history_size: vars.parse("MAX_HISTORY_SIZE", 5000)?,
            max_report_size: vars.parse("MAX_REPORT_SIZE", 500)?,
        };

        let arxiv = ArxivConfig {
            keywords: vars.list("ARXIV_KEYWORDS", ',', DEFAULT_ARXIV_KEYWORDS),
            category: vars.string("ARXIV_CATEGORY", "q-fin"),
            page_size: vars.parse("ARXIV_PAGE_SIZE", 50)?,
        };
        at_least("ARXIV_PAGE_SIZE", arxiv.page_size, 1)?;

        let scholar = ScholarConfig {
            api_key: vars.optional("SERPAPI_KEY"),
            queries: vars.list("SCHOLAR_QUERIES", '|', DEFAULT_SCHOLAR_QUERIES),
            results_per_query: vars.parse("SCHOLAR_RESULTS_PER_QUERY", 10)?,
        };

        let rss = RssConfig {
            feeds: parse_feeds("RSS_FEEDS", &vars.string("RSS_FEEDS", ""))?,
            max_age_hours: in_range(
                "RSS_MAX_AGE_HOURS",
                vars.parse("RSS_MAX_AGE_HOURS", 24)?,
                1,
                MAX_RSS_AGE_HOURS,
            )?,
        };

        let reports = ReportsConfig {
            enabled: vars.parse("REPORTS_ENABLED", true)?,
            api_url: vars.string("REPORT_API_URL", "https://reportapi.eastmoney.com/report/list"),
            report_type: vars.parse("REPORT_TYPE", 0)?,
            brokers: vars.list("REPORT_BROKERS", ',', DEFAULT_REPORT_BROKERS),
            keywords: vars.list("REPORT_KEYWORDS", ',', DEFAULT_REPORT_KEYWORDS),
            lookback_days: in_range("REPORT_LOOKBACK_DAYS", vars.parse("REPORT_LOOKBACK_DAYS", 1)?, 0, 365)?,
            page_size: at_least("REPORT_PAGE_SIZE", vars.parse("REPORT_PAGE_SIZE", 500)?, 1)?,
            max_results: vars.parse("REPORT_MAX_RESULTS", 50)?,
        };

        let briefing = BriefingConfig {
            feeds: parse_feeds("BRIEFING_FEEDS", &vars.string("BRIEFING_FEEDS", DEFAULT_BRIEFING_FEEDS))?,
            max_age_hours: in_range(
                "BRIEFING_MAX_AGE_HOURS",
                vars.parse("BRIEFING_MAX_AGE_HOURS", 24)?,
                1,
                MAX_RSS_AGE_HOURS,
            )?,
            max_headlines: at_least("BRIEFING_MAX_HEADLINES", vars.parse("BRIEFING_MAX_HEADLINES", 40)?, 1)?,
            email_headlines: vars.parse("BRIEFING_EMAIL_HEADLINES", 20)?,
        };

        let oracle = OracleConfig {
            base_url: vars.string("LLM_BASE_URL", "https://api.deepseek.com"),
            model: vars.string("LLM_MODEL", "deepseek-chat"),
            api_key: vars
                .optional("LLM_API_KEY")
                .ok_or(ConfigError::Missing("LLM_API_KEY"))?,
            fallback_score: vars.parse("ORACLE_FALLBACK_SCORE", 5.0)?,
        };

        let email = match (vars.optional("EMAIL_USER"), vars.optional("EMAIL_PASS")) {
            (Some(user), Some(pass)) => Some(EmailConfig {
                to: vars.optional("EMAIL_TO").unwrap_or_else(|| user.clone()),
                smtp_host: vars.string("SMTP_HOST", "smtp.qq.com"),
                user,
                pass,
            }),
            _ => None,
        };

        let notify = NotifyConfig {
            push_threshold: vars.parse("PUSH_THRESHOLD", notify_defaults.push_threshold)?,
            highlight_score: vars.parse("HIGHLIGHT_SCORE", notify_defaults.highlight_score)?,
            push_limit: at_least(
                "DINGTALK_PUSH_LIMIT",
                vars.parse("DINGTALK_PUSH_LIMIT", notify_defaults.push_limit)?,
                1,
            )?,
            email_item_limit: vars
                .parse("MAX_EMAIL_ITEM_LIMIT", notify_defaults.email_item_limit)?,
            dingtalk_webhook: vars.optional("DINGTALK_WEBHOOK"),
            discord_webhook: vars.optional("DISCORD_WEBHOOK"),
            email,
        };

        Ok(Self {
            mode: vars.parse("RUN_MODE", RunMode::default())?,
            curation,
            store,
            arxiv,
            scholar,
            rss,
            reports,
            briefing,
            oracle,
            notify,
            dry_run: vars.parse("DRY_RUN", false)?,
        })
    }
}

fn at_least(key: &'static str, value: usize, min: usize) -> Result<usize, ConfigError> {
    if value < min {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: format!("must be at least {}", min),
        });
    }
    Ok(value)
}

fn in_range(key: &'static str, value: i64, min: i64, max: i64) -> Result<i64, ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: format!("must be between {} and {}", min, max),
        });
    }
    Ok(value)
}

/// Log level from `LOG_LEVEL`, read before the rest of the config so startup
/// faults can be logged.
pub fn log_level_from_env() -> Level {
    dotenv::var("LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO)
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn list(&self, key: &str, separator: char, default: &[&str]) -> Vec<String> {
        match self.optional(key) {
            Some(raw) => raw
                .split(separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Parse `name=url,name=url`.
fn parse_feeds(key: &'static str, raw: &str) -> Result<Vec<FeedConfig>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                key,
                value: entry.to_string(),
                reason: "expected name=url".to_string(),
            })?;
            Ok(FeedConfig {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("LLM_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.curation.min_score, 5.0);
        assert_eq!(config.curation.final_save_count, 15);
        assert_eq!(config.curation.strictness, Strictness::Trim);
        assert_eq!(config.notify.push_threshold, 6.0);
        assert_eq!(config.notify.push_limit, 5);
        assert_eq!(config.store.max_report_size, 500);
        assert_eq!(config.arxiv.keywords.len(), DEFAULT_ARXIV_KEYWORDS.len());
        assert_eq!(config.oracle.base_url, "https://api.deepseek.com");
        assert!(config.scholar.api_key.is_none());
        assert!(config.notify.email.is_none());
        assert!(config.rss.feeds.is_empty());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("LLM_API_KEY")));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        assert!(load(&[("LLM_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_unparsable_number_is_fatal() {
        let err = load(&[("LLM_API_KEY", "k"), ("MIN_SCORE", "high")]).unwrap_err();
        match err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(key, "MIN_SCORE");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_quota_rejected() {
        assert!(load(&[("LLM_API_KEY", "k"), ("FINAL_SAVE_COUNT", "0")]).is_err());
    }

    #[test]
    fn test_rss_age_window_bounds() {
        for bad in ["0", "-5", "10000000000000"] {
            let err = load(&[("LLM_API_KEY", "k"), ("RSS_MAX_AGE_HOURS", bad)]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "RSS_MAX_AGE_HOURS", .. }));
        }
        let config = load(&[("LLM_API_KEY", "k"), ("RSS_MAX_AGE_HOURS", "876000")]).unwrap();
        assert_eq!(config.rss.max_age_hours, MAX_RSS_AGE_HOURS);
    }

    #[test]
    fn test_reports_and_briefing_defaults() {
        let config = load(&[("LLM_API_KEY", "k")]).unwrap();
        assert_eq!(config.mode, RunMode::Curate);
        assert!(config.reports.enabled);
        assert_eq!(config.reports.brokers.len(), 10);
        assert!(config.reports.keywords.contains(&"金工".to_string()));
        assert_eq!(config.reports.max_results, 50);
        assert_eq!(config.briefing.feeds.len(), 7);
        assert_eq!(config.briefing.feeds[2].name, "WSJ_Market");
        assert_eq!(config.briefing.max_headlines, 40);
        assert_eq!(config.briefing.email_headlines, 20);
    }

    #[test]
    fn test_briefing_mode_and_report_overrides() {
        let config = load(&[
            ("LLM_API_KEY", "k"),
            ("RUN_MODE", "Briefing"),
            ("REPORTS_ENABLED", "false"),
            ("REPORT_BROKERS", "中金公司"),
            ("BRIEFING_FEEDS", "FT=https://www.ft.com/?format=rss"),
        ])
        .unwrap();
        assert_eq!(config.mode, RunMode::Briefing);
        assert!(!config.reports.enabled);
        assert_eq!(config.reports.brokers, vec!["中金公司".to_string()]);
        assert_eq!(config.briefing.feeds.len(), 1);

        assert!(load(&[("LLM_API_KEY", "k"), ("RUN_MODE", "daily")]).is_err());
    }

    #[test]
    fn test_zero_push_limit_rejected() {
        let err = load(&[("LLM_API_KEY", "k"), ("DINGTALK_PUSH_LIMIT", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DINGTALK_PUSH_LIMIT", .. }));
    }

    #[test]
    fn test_overrides_and_lists() {
        let config = load(&[
            ("LLM_API_KEY", "k"),
            ("FINAL_SAVE_COUNT", "20"),
            ("IDENTITY_NORMALIZATION", "folded"),
            ("SCHOLAR_QUERIES", "factor investing | momentum, crash risk"),
            ("RSS_FEEDS", "WSJ=https://feeds.a.dj.com/rss/RSSMarketsMain.xml, FT=https://www.ft.com/?format=rss"),
            ("EMAIL_USER", "me@example.com"),
            ("EMAIL_PASS", "secret"),
            ("DRY_RUN", "true"),
        ])
        .unwrap();
        assert_eq!(config.curation.final_save_count, 20);
        assert_eq!(config.curation.strictness, Strictness::Folded);
        assert_eq!(
            config.scholar.queries,
            vec!["factor investing".to_string(), "momentum, crash risk".to_string()]
        );
        assert_eq!(config.rss.feeds.len(), 2);
        assert_eq!(config.rss.feeds[1].name, "FT");
        assert_eq!(config.rss.feeds[1].url, "https://www.ft.com/?format=rss");
        let email = config.notify.email.unwrap();
        assert_eq!(email.to, "me@example.com");
        assert_eq!(email.smtp_host, "smtp.qq.com");
        assert!(config.dry_run);
    }

    #[test]
    fn test_malformed_feed_entry() {
        assert!(load(&[("LLM_API_KEY", "k"), ("RSS_FEEDS", "no-equals-sign")]).is_err());
    }
}
