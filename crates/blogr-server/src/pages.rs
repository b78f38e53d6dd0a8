//! Server-rendered HTML pages.
//!
//! Every value that came from a user (usernames, titles, bodies, error text
//! echoing a username) goes through [`escape`] before it is interpolated.

use blogr_types::{Post, User};

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:0 auto;padding:1rem}\
nav{display:flex;align-items:center;gap:1rem;background:lightgray;padding:0 .5rem}\
nav h1{flex:auto;margin:0}nav ul{display:flex;list-style:none;gap:.5rem;padding:0}\
.flash{margin:1em 0;padding:1em;background:#cae6f6;border:1px solid #377ba8}\
.post .about{color:slategray;font-style:italic;font-size:.85em}\
.post .body{white-space:pre-line}form{display:flex;flex-direction:column;gap:.3rem}\
input,textarea{margin-bottom:.5em}textarea{min-height:12em}";

fn nav(user: Option<&User>) -> String {
    match user {
        Some(user) => format!(
            r#"<li><span>{}</span></li><li><a href="/auth/logout">Log Out</a></li>"#,
            escape(&user.username)
        ),
        None => r#"<li><a href="/auth/register">Register</a></li><li><a href="/auth/login">Log In</a></li>"#
            .to_string(),
    }
}

fn layout(title: &str, user: Option<&User>, header: &str, error: Option<&str>, content: &str) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="flash">{}</div>"#, escape(e)))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en"><head>
<meta charset="utf-8">
<title>{title} - Blogr</title>
<style>{STYLE}</style>
</head><body>
<nav><h1><a href="/">Blogr</a></h1><ul>{nav}</ul></nav>
<section class="content">
<header>{header}</header>
{error_html}
{content}
</section>
</body></html>"#,
        title = escape(title),
        nav = nav(user),
    )
}

fn credentials_form(action: &str, submit: &str, username: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
  <label for="username">Username</label>
  <input name="username" id="username" value="{username}" required autocomplete="username">
  <label for="password">Password</label>
  <input type="password" name="password" id="password" required>
  <input type="submit" value="{submit}">
</form>"#,
        username = escape(username),
    )
}

/// `GET /auth/register`, or the form re-rendered with `error`.
pub fn register_page(user: Option<&User>, error: Option<&str>, username: &str) -> String {
    layout(
        "Register",
        user,
        "<h1>Register</h1>",
        error,
        &credentials_form("/auth/register", "Register", username),
    )
}

/// `GET /auth/login`, or the form re-rendered with `error`.
pub fn login_page(user: Option<&User>, error: Option<&str>, username: &str) -> String {
    layout(
        "Log In",
        user,
        "<h1>Log In</h1>",
        error,
        &credentials_form("/auth/login", "Log In", username),
    )
}

/// The post list. Authors get an edit link on their own posts.
pub fn index_page(user: Option<&User>, posts: &[Post]) -> String {
    let header = match user {
        Some(_) => r#"<h1>Posts</h1><a class="action" href="/create">New</a>"#,
        None => "<h1>Posts</h1>",
    };

    let articles: Vec<String> = posts
        .iter()
        .map(|post| {
            let edit = match user {
                Some(user) if post.is_authored_by(user) => {
                    format!(r#"<a class="action" href="/{}/update">Edit</a>"#, post.id)
                }
                _ => String::new(),
            };
            format!(
                r#"<article class="post">
  <header><div><h1>{title}</h1><div class="about">by {author} on {date}</div></div>{edit}</header>
  <p class="body">{body}</p>
</article>"#,
                title = escape(&post.title),
                author = escape(&post.username),
                date = escape(post.created_date()),
                body = escape(&post.body),
            )
        })
        .collect();

    layout("Posts", user, header, None, &articles.join("\n<hr>\n"))
}

fn post_form(title: &str, body: &str, submit: &str) -> String {
    format!(
        r#"<form method="post">
  <label for="title">Title</label>
  <input name="title" id="title" value="{title}" required>
  <label for="body">Body</label>
  <textarea name="body" id="body">{body}</textarea>
  <input type="submit" value="{submit}">
</form>"#,
        title = escape(title),
        body = escape(body),
    )
}

/// `GET /create`, or the form re-rendered with `error`.
pub fn create_page(user: Option<&User>, error: Option<&str>, title: &str, body: &str) -> String {
    layout(
        "New Post",
        user,
        "<h1>New Post</h1>",
        error,
        &post_form(title, body, "Save"),
    )
}

/// `GET /{id}/update`, or the form re-rendered with `error`.
///
/// `title` and `body` are the values to show in the form, which after a
/// failed submission are the submitted ones rather than the stored ones.
pub fn update_page(
    user: Option<&User>,
    post: &Post,
    error: Option<&str>,
    title: &str,
    body: &str,
) -> String {
    let delete = format!(
        r#"<hr><form action="/{}/delete" method="post"><input class="danger" type="submit" value="Delete" onclick="return confirm('Are you sure?');"></form>"#,
        post.id
    );
    let header = format!(r#"<h1>Edit "{}"</h1>"#, escape(&post.title));
    layout(
        "Edit",
        user,
        &header,
        error,
        &format!("{}{}", post_form(title, body, "Save"), delete),
    )
}

/// Generic error page for 4xx/5xx responses.
pub fn error_page(status: u16, reason: &str, message: &str) -> String {
    layout(
        reason,
        None,
        &format!("<h1>{status} {}</h1>", escape(reason)),
        None,
        &format!("<p>{}</p>", escape(message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            password_hash: String::new(),
        }
    }

    fn post(author_id: i64) -> Post {
        Post {
            id: 9,
            title: "<script>alert(1)</script>".to_string(),
            body: "hello & bye".to_string(),
            created: "2024-05-01 10:00:00".to_string(),
            author_id,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn escape_covers_html_metacharacters() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn index_escapes_post_content() {
        let html = index_page(None, &[post(1)]);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello &amp; bye"));
        assert!(html.contains("by alice on 2024-05-01"));
    }

    #[test]
    fn edit_link_only_for_author() {
        let user = alice();
        assert!(index_page(Some(&user), &[post(1)]).contains(r#"href="/9/update""#));
        assert!(!index_page(Some(&user), &[post(2)]).contains(r#"href="/9/update""#));
        assert!(!index_page(None, &[post(1)]).contains(r#"href="/9/update""#));
    }

    #[test]
    fn nav_reflects_identity() {
        let user = alice();
        let anonymous = login_page(None, None, "");
        assert!(anonymous.contains(r#"href="/auth/register""#));
        assert!(!anonymous.contains("Log Out"));

        let logged_in = index_page(Some(&user), &[]);
        assert!(logged_in.contains("<span>alice</span>"));
        assert!(logged_in.contains(r#"href="/auth/logout""#));
        assert!(logged_in.contains(r#"href="/create""#));
    }

    #[test]
    fn form_error_and_value_are_escaped() {
        let html = register_page(None, Some("User <b> is already registered."), "<b>");
        assert!(html.contains(r#"<div class="flash">User &lt;b&gt; is already registered.</div>"#));
        assert!(html.contains(r#"value="&lt;b&gt;""#));
    }
}
