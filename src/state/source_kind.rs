use std::fmt;

/// How a source's content is best reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Crawl outward from the home page
    Homepage,
    /// The source exposes an RSS/Atom feed
    Feed,
    /// The source exposes at least one sitemap
    Sitemap,
    /// Configured by hand; discovery never overrides it
    Custom,
}

impl SourceType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Feed => "feed",
            Self::Sitemap => "sitemap",
            Self::Custom => "custom",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "homepage" => Some(Self::Homepage),
            "feed" => Some(Self::Feed),
            "sitemap" => Some(Self::Sitemap),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Kind of sitemap, guessed from its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitemapType {
    Standard,
    Index,
    News,
    Image,
    Video,
}

impl SitemapType {
    /// Classifies a sitemap by the conventional words in its URL
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("index") {
            Self::Index
        } else if lower.contains("news") {
            Self::News
        } else if lower.contains("image") {
            Self::Image
        } else if lower.contains("video") {
            Self::Video
        } else {
            Self::Standard
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Index => "index",
            Self::News => "news",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "index" => Some(Self::Index),
            "news" => Some(Self::News),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Lifecycle of a discovered sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitemapStatus {
    Pending,
    Fetched,
    Failed,
}

impl SitemapStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Fetched => "FETCHED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "FETCHED" => Some(Self::Fetched),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SitemapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl fmt::Display for SitemapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
