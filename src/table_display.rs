use clover_client::api::models::{FeedItem, GroupInfo, UserInfo};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn count(value: Option<u64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

/// Shorten long post bodies so rows stay on one screen line
fn excerpt(content: &str, max_chars: usize) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        single_line
    } else {
        let cut: String = single_line.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

pub fn display_users(users: &[UserInfo]) {
    if users.is_empty() {
        println!("{}", "No users found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["id", "name", "email"]));

    for user in users {
        table.add_row(vec![text(&user.user_id), user.name(), text(&user.email)]);
    }

    println!("{table}");
    println!("\n{}", format!("{} users", users.len()).green());
}

pub fn display_user(user: &UserInfo) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["field", "value"]));

    let rows = [
        ("id", text(&user.user_id)),
        ("name", user.name()),
        ("email", text(&user.email)),
        ("gender", text(&user.gender)),
        ("phone", text(&user.phone_no)),
        ("birthday", text(&user.day_of_birth)),
        ("avatar", text(&user.avatar_img_url)),
    ];
    for (field, value) in rows {
        if !value.is_empty() {
            table.add_row(vec![field.to_string(), value]);
        }
    }

    println!("{table}");
}

pub fn display_groups(groups: &[GroupInfo]) {
    if groups.is_empty() {
        println!("{}", "No groups found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["id", "name", "privacy", "members", "description"]));

    for group in groups {
        table.add_row(vec![
            text(&group.group_id),
            text(&group.name),
            text(&group.group_privacy),
            count(group.total_member),
            excerpt(&text(&group.description), 60),
        ]);
    }

    println!("{table}");
    println!("\n{}", format!("{} groups", groups.len()).green());
}

pub fn display_feed(posts: &[FeedItem]) {
    if posts.is_empty() {
        println!("{}", "No posts found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["id", "author", "posted", "comments", "reactions", "content"]));

    for post in posts {
        table.add_row(vec![
            text(&post.post_id),
            post.author.as_ref().map(UserInfo::name).unwrap_or_default(),
            text(&post.created_at),
            count(post.total_comment),
            count(post.total_reaction),
            excerpt(&text(&post.content), 80),
        ]);
    }

    println!("{table}");
    println!("\n{}", format!("{} posts", posts.len()).green());
}
