// Display helpers for account profiles and statuses.

use crate::api::{Status, User};

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

/// Multi-line profile summary used by the `user` command.
pub fn format_profile(user: &User) -> String {
    let mut flags = Vec::new();
    if user.verified {
        flags.push("verified");
    }
    if user.protected {
        flags.push("protected");
    }

    let mut out = format!("@{} ({})", user.screen_name, user.name);
    if !flags.is_empty() {
        out.push_str(&format!(" [{}]", flags.join(", ")));
    }
    out.push('\n');
    out.push_str(&format!(" Id: {}. CreatedAt: {}.\n", user.id_str, user.created_at));
    out.push_str(&format!(" Description: {}\n", or_dash(user.description.as_deref())));
    out.push_str(&format!(
        " Location: {}. URL: {}. Lang: {}.\n",
        or_dash(user.location.as_deref()),
        or_dash(user.url.as_deref()),
        or_dash(user.lang.as_deref())
    ));
    out.push_str(&format!(
        " FollowersCount: {}. FriendsCount: {}. StatusesCount: {}. FavouritesCount: {}. ListedCount: {}.",
        user.followers_count,
        user.friends_count,
        user.statuses_count,
        user.favourites_count,
        user.listed_count
    ));
    out
}

/// One line of a follower listing.
pub fn format_follower(user: &User) -> String {
    format!("    @{}, {}", user.screen_name, user.name)
}

/// One search hit; `None` for statuses with no text.
pub fn format_status(index: usize, status: &Status) -> Option<String> {
    let body = status.body();
    if body.is_empty() {
        return None;
    }
    Some(format!("[{}] {}", index, body))
}
