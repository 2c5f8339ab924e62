use crate::models::{Banner, CreditGroups, HomeFeed, MediaCard, MediaDetail};

/// Turns object-storage keys into public CDN URLs
#[derive(Debug, Clone, Default)]
pub struct UrlRewriter {
    base: Option<String>,
}

impl UrlRewriter {
    pub fn new(cdn_base: Option<String>) -> Self {
        let base = cdn_base
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());

        Self { base }
    }

    /// `None` for blank keys; the key itself when no CDN base is configured
    pub fn to_public_url(&self, key: Option<&str>) -> Option<String> {
        let key = key.map(str::trim).filter(|k| !k.is_empty())?;

        Some(match &self.base {
            Some(base) => format!("{}/{}", base, key.trim_start_matches('/')),
            None => key.to_string(),
        })
    }

    pub fn card(&self, mut card: MediaCard) -> MediaCard {
        card.poster_url = self.to_public_url(card.poster_key.as_deref());
        card
    }

    pub fn cards(&self, cards: Vec<MediaCard>) -> Vec<MediaCard> {
        cards.into_iter().map(|card| self.card(card)).collect()
    }

    pub fn banner(&self, mut banner: Banner) -> Banner {
        banner.backdrop_url = self.to_public_url(
            banner
                .backdrop_key
                .as_deref()
                .or(banner.poster_key.as_deref()),
        );
        banner
    }

    fn credits(&self, mut groups: CreditGroups) -> CreditGroups {
        for person in groups
            .directors
            .iter_mut()
            .chain(groups.writers.iter_mut())
            .chain(groups.cast.iter_mut())
            .chain(groups.producers.iter_mut())
            .chain(groups.others.iter_mut())
        {
            person.avatar_url = self.to_public_url(person.avatar_key.as_deref());
        }
        groups
    }

    pub fn detail(&self, mut detail: MediaDetail) -> MediaDetail {
        detail.poster_url = self.to_public_url(detail.record.poster_key.as_deref());
        detail.backdrop_url = self.to_public_url(detail.record.backdrop_key.as_deref());
        detail.credits = self.credits(detail.credits);
        detail.similar = self.cards(detail.similar);
        detail
    }

    pub fn home(&self, feed: HomeFeed) -> HomeFeed {
        HomeFeed {
            banners: feed.banners.into_iter().map(|b| self.banner(b)).collect(),
            hot_movies: self.cards(feed.hot_movies),
            hot_tv: self.cards(feed.hot_tv),
            hot_anime_cn: self.cards(feed.hot_anime_cn),
            hot_anime_jp: self.cards(feed.hot_anime_jp),
        }
    }
}
