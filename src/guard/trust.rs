use url::Url;

use crate::config::TrustConfig;

/// Domains that are scanned normally but never blocked.
#[rustfmt::skip]
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    // Google
    "google.com", "google.co.in", "google.co.uk", "google.com.au",
    "googleapis.com", "gstatic.com", "gmail.com", "googlemail.com",
    "googlevideo.com", "googleusercontent.com",
    // YouTube
    "youtube.com", "youtu.be", "ytimg.com", "youtube-nocookie.com",
    // Microsoft
    "microsoft.com", "microsoftonline.com", "live.com", "outlook.com",
    "office.com", "office365.com", "sharepoint.com", "bing.com",
    "msn.com", "skype.com", "azure.com", "azurewebsites.net",
    "windows.com", "xbox.com", "onedrive.com",
    // Apple
    "apple.com", "icloud.com", "itunes.com",
    // Meta
    "facebook.com", "fb.com", "instagram.com", "whatsapp.com",
    "fbcdn.net", "messenger.com",
    // Amazon / AWS
    "amazon.com", "amazon.in", "amazon.co.uk", "amazonaws.com", "awsstatic.com",
    // Government (India)
    "gov.in", "nic.in", "gujarat.gov.in", "india.gov.in",
    "mygov.in", "digitalindia.gov.in", "irctc.co.in",
    // Education / dev
    "wikipedia.org", "wikimedia.org",
    "stackoverflow.com", "github.com", "githubusercontent.com",
    "gitlab.com", "npmjs.com", "pypi.org",
    // Finance (India)
    "sbi.co.in", "hdfcbank.com", "icicibank.com", "axisbank.com",
    "kotakbank.com", "paytm.com", "phonepe.com",
    "razorpay.com", "billdesk.com", "ccavenue.com",
    // Social / media
    "twitter.com", "x.com", "t.co",
    "linkedin.com", "licdn.com",
    "reddit.com", "redd.it", "redditmedia.com",
    "medium.com", "quora.com",
    "netflix.com", "hotstar.com", "disneyplus.com", "primevideo.com",
    // CDN / infrastructure
    "cloudflare.com", "cloudfront.net", "akamaized.net",
    "fastly.net", "jsdelivr.net",
    // Hosting
    "vercel.app", "netlify.app", "onrender.com",
    // Search
    "duckduckgo.com", "yahoo.com",
];

#[derive(Debug, Clone)]
pub struct TrustPolicy {
    domains: Vec<String>,
}

impl TrustPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| normalize_host(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn from_config(config: &TrustConfig) -> Self {
        let mut domains: Vec<&str> = DEFAULT_TRUSTED_DOMAINS.to_vec();
        domains.extend(config.extra_domains.iter().map(String::as_str));
        Self::new(domains)
    }

    /// True when the URL's host equals or is a subdomain of a trusted entry.
    /// Unparseable URLs are never trusted.
    pub fn is_trusted(&self, raw_url: &str) -> bool {
        let Some(host) = Url::parse(raw_url)
            .ok()
            .and_then(|url| url.host_str().map(normalize_host))
        else {
            return false;
        };
        self.domains.iter().any(|trusted| {
            host == *trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}
