#![forbid(unsafe_code)]

//! Platform link registry.
//!
//! Canonical social/contact platforms with display name, icon token,
//! brand color, and a profile URL builder. The mention extension in the
//! markdown pipeline shares this vocabulary, so `{GH@handle}` resolves
//! to the same `github` record a profile row uses.

use longform_backdrop::Rgba;

/// One supported platform.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Canonical id (`github`, `rss`, ...).
    pub id: &'static str,
    /// Display name, localized the way the platform brands itself.
    pub name: &'static str,
    /// Icon token for the host's icon set.
    pub icon: &'static str,
    /// Brand background color.
    pub brand_color: Rgba,
    build_url: fn(&str) -> String,
}

impl Platform {
    /// Profile URL for `handle`. Some platforms (RSS, WeChat) treat the
    /// handle as the target itself and return it verbatim.
    #[must_use]
    pub fn url(&self, handle: &str) -> String {
        (self.build_url)(handle)
    }
}

static PLATFORMS: [Platform; 14] = [
    Platform {
        id: "github",
        name: "Github",
        icon: "github-line",
        brand_color: Rgba::rgb(0x00, 0x00, 0x00),
        build_url: |handle| format!("https://github.com/{handle}"),
    },
    Platform {
        id: "twitter",
        name: "Twitter",
        icon: "twitter-line",
        brand_color: Rgba::rgb(0x1D, 0xA1, 0xF2),
        build_url: |handle| format!("https://twitter.com/{handle}"),
    },
    Platform {
        id: "x",
        name: "x",
        icon: "x",
        brand_color: Rgba::rgb(36, 46, 54),
        build_url: |handle| format!("https://x.com/{handle}"),
    },
    Platform {
        id: "telegram",
        name: "Telegram",
        icon: "telegram-line",
        brand_color: Rgba::rgb(0x00, 0x88, 0xCC),
        build_url: |handle| format!("https://t.me/{handle}"),
    },
    Platform {
        id: "mail",
        name: "Email",
        icon: "mail-line",
        brand_color: Rgba::rgb(0xD4, 0x46, 0x38),
        build_url: |handle| format!("mailto:{handle}"),
    },
    Platform {
        id: "rss",
        name: "RSS",
        icon: "rss-line",
        brand_color: Rgba::rgb(0xFF, 0xA5, 0x00),
        build_url: |handle| handle.to_string(),
    },
    Platform {
        id: "bilibili",
        name: "哔哩哔哩",
        icon: "bilibili",
        brand_color: Rgba::rgb(0x00, 0xA1, 0xD6),
        build_url: |handle| format!("https://space.bilibili.com/{handle}"),
    },
    Platform {
        id: "netease",
        name: "网易云音乐",
        icon: "netease-cloud-music",
        brand_color: Rgba::rgb(0xC2, 0x0C, 0x0C),
        build_url: |handle| format!("https://music.163.com/#/user/home?id={handle}"),
    },
    Platform {
        id: "qq",
        name: "QQ",
        icon: "qq-fill",
        brand_color: Rgba::rgb(0x1E, 0x6F, 0xFF),
        build_url: |handle| format!("https://wpa.qq.com/msgrd?v=3&uin={handle}&site=qq&menu=yes"),
    },
    Platform {
        id: "wechat",
        name: "微信",
        icon: "wechat-fill",
        brand_color: Rgba::rgb(0x2D, 0xC1, 0x00),
        build_url: |handle| handle.to_string(),
    },
    Platform {
        id: "weibo",
        name: "微博",
        icon: "weibo-line",
        brand_color: Rgba::rgb(0xE6, 0x16, 0x2D),
        build_url: |handle| format!("https://weibo.com/{handle}"),
    },
    Platform {
        id: "discord",
        name: "Discord",
        icon: "discord-fill",
        brand_color: Rgba::rgb(0x72, 0x89, 0xDA),
        build_url: |handle| format!("https://discord.gg/{handle}"),
    },
    Platform {
        id: "bluesky",
        name: "Bluesky",
        icon: "bluesky",
        brand_color: Rgba::rgb(0x00, 0x85, 0xFF),
        build_url: |handle| format!("https://bsky.app/profile/{handle}"),
    },
    Platform {
        id: "steam",
        name: "Steam",
        icon: "steam",
        brand_color: Rgba::rgb(0x0F, 0x1C, 0x30),
        build_url: |handle| format!("https://steamcommunity.com/id/{handle}"),
    },
];

/// Aliases accepted at lookup and resolved to canonical ids.
const ALIASES: &[(&str, &str)] = &[("email", "mail"), ("feed", "rss")];

/// All supported platforms, in registry order.
#[must_use]
pub fn all() -> &'static [Platform] {
    &PLATFORMS
}

/// The platform for `id`, accepting aliases. Unknown ids are `None`.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static Platform> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map_or(id, |(_, target)| *target);
    PLATFORMS.iter().find(|platform| platform.id == canonical)
}

/// Whether `id` (canonical or alias) names a supported platform.
#[must_use]
pub fn is_supported(id: &str) -> bool {
    lookup(id).is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn profile_urls_are_built_per_platform() {
        let cases = [
            ("github", "alice", "https://github.com/alice"),
            ("telegram", "alice", "https://t.me/alice"),
            ("bilibili", "123", "https://space.bilibili.com/123"),
            (
                "netease",
                "456",
                "https://music.163.com/#/user/home?id=456",
            ),
            (
                "qq",
                "789",
                "https://wpa.qq.com/msgrd?v=3&uin=789&site=qq&menu=yes",
            ),
            ("bluesky", "alice.bsky.social", "https://bsky.app/profile/alice.bsky.social"),
            ("steam", "alice", "https://steamcommunity.com/id/alice"),
            ("mail", "a@example.com", "mailto:a@example.com"),
        ];
        for (id, handle, expected) in cases {
            let platform = lookup(id).unwrap();
            assert_eq!(platform.url(handle), expected, "platform {id}");
        }
    }

    #[test]
    fn rss_and_wechat_take_the_handle_verbatim() {
        let feed = "https://example.com/feed.xml";
        assert_eq!(lookup("rss").unwrap().url(feed), feed);
        assert_eq!(lookup("wechat").unwrap().url("qr.png"), "qr.png");
    }

    #[test]
    fn aliases_resolve_to_canonical_platforms() {
        assert_eq!(lookup("email").unwrap().id, "mail");
        assert_eq!(lookup("feed").unwrap().id, "rss");
        assert!(is_supported("email"));
        assert!(is_supported("feed"));
    }

    #[test]
    fn unknown_ids_are_unsupported() {
        assert!(lookup("myspace").is_none());
        assert!(!is_supported("myspace"));
        assert!(!is_supported(""));
    }

    #[test]
    fn registry_ids_are_unique_and_self_resolving() {
        let ids: HashSet<&str> = all().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), all().len());
        for platform in all() {
            assert_eq!(lookup(platform.id).unwrap().id, platform.id);
        }
    }

    #[test]
    fn mention_vocabulary_is_supported() {
        for (code, platform) in longform_markdown::extensions::MENTION_PLATFORMS {
            assert!(
                is_supported(platform),
                "mention code {code} names unsupported platform {platform}"
            );
        }
    }

    #[test]
    fn brand_colors_match_the_platforms() {
        assert_eq!(lookup("twitter").unwrap().brand_color, Rgba::rgb(0x1D, 0xA1, 0xF2));
        assert_eq!(lookup("discord").unwrap().brand_color, Rgba::rgb(0x72, 0x89, 0xDA));
    }
}
