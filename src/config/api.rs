use crate::utils::TimeUtils;

/// Fixed quota an external API publishes: at most `capacity` calls per `window_ms`.
pub struct ApiQuota {
    pub limiter_key: &'static str,
    pub capacity: u32,
    pub window_ms: i64,
}

pub struct ApiEndpoint {
    pub base_url: &'static str,
    pub quota: ApiQuota,
}

pub struct ClientDefaults {
    pub timeout_ms: u64,
    pub user_agent: &'static str,
}

/// Quotas and endpoints for every external data source the app talks to.
pub struct ApiQuotaConfig {
    pub marvel: ApiEndpoint,
    pub comic_vine: ApiEndpoint,
    pub isbndb: ApiEndpoint,
    pub news_feed: ApiEndpoint,
    pub client: ClientDefaults,
}

impl ApiQuotaConfig {
    pub fn endpoints(&self) -> [&ApiEndpoint; 4] {
        [&self.marvel, &self.comic_vine, &self.isbndb, &self.news_feed]
    }
}

pub const API_QUOTAS: ApiQuotaConfig = ApiQuotaConfig {
    marvel: ApiEndpoint {
        base_url: "https://gateway.marvel.com/v1/public",
        quota: ApiQuota {
            limiter_key: "marvel",
            capacity: 3000,
            window_ms: TimeUtils::MS_IN_D,
        },
    },
    comic_vine: ApiEndpoint {
        base_url: "https://comicvine.gamespot.com/api",
        quota: ApiQuota {
            limiter_key: "comicvine",
            capacity: 200,
            window_ms: TimeUtils::MS_IN_H,
        },
    },
    isbndb: ApiEndpoint {
        base_url: "https://api2.isbndb.com",
        quota: ApiQuota {
            limiter_key: "isbndb",
            capacity: 1,
            window_ms: TimeUtils::MS_IN_S,
        },
    },
    news_feed: ApiEndpoint {
        base_url: "https://api.rss2json.com/v1",
        quota: ApiQuota {
            limiter_key: "news",
            capacity: 2,
            window_ms: TimeUtils::MS_IN_S,
        },
    },
    client: ClientDefaults {
        timeout_ms: 5000,
        user_agent: "comic-market-data/0.1",
    },
};
