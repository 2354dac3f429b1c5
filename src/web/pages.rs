//! Server-rendered content pages: home, borrow, invest, about us and our team.
//!
//! The pages are plain HTML strings. Anything that comes from the database is
//! passed through [`escape_html`] before it is written into the markup.

use crate::{core::team::list_team_members, entities::team_member, errors::Result};
use actix_web::{HttpResponse, get, web};
use sea_orm::DatabaseConnection;

const NAV: &[(&str, &str)] = &[
    ("/", "Home"),
    ("/borrow", "Borrow"),
    ("/invest", "Invest"),
    ("/about-us", "About us"),
    ("/our-team", "Our team"),
];

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    let nav: String = NAV
        .iter()
        .map(|(href, label)| format!("<a href=\"{href}\">{label}</a>"))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | VigoLend</title>\n</head>\n<body>\n<nav>{nav}</nav>\n\
         <main>\n{body}\n</main>\n</body>\n</html>\n"
    )
}

fn html(page: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn render_member(member: &team_member::Model) -> String {
    let facebook = member
        .facebook
        .as_deref()
        .map(|url| format!(" <a href=\"{}\">Facebook</a>", escape_html(url)))
        .unwrap_or_default();

    format!(
        "<li class=\"team-member\"><img src=\"/media/{photo}\" alt=\"{name}\">\
         <h3>{name}</h3><p>{designation}</p><p>{twitter}{facebook}</p></li>",
        photo = escape_html(&member.photo),
        name = escape_html(&member.name),
        designation = escape_html(&member.designation),
        twitter = escape_html(&member.twitter),
    )
}

fn render_team(members: &[team_member::Model]) -> String {
    if members.is_empty() {
        return "<p>Our team will be introduced here soon.</p>".to_string();
    }
    let items: String = members.iter().map(render_member).collect();
    format!("<ul class=\"team\">{items}</ul>")
}

#[get("/")]
async fn home() -> HttpResponse {
    html(layout(
        "Peer-to-peer lending",
        "<h1>Lending that works for borrowers and investors</h1>\n\
         <p>VigoLend connects people who need a loan with people who want their \
         savings to earn a fair return.</p>\n\
         <p><a href=\"/borrow\">Get a loan</a> or <a href=\"/invest\">start investing</a>.</p>",
    ))
}

#[get("/borrow")]
async fn borrow() -> HttpResponse {
    html(layout(
        "Borrow",
        "<h1>Borrow</h1>\n\
         <p>Apply online, verify your identity once and receive offers funded \
         directly by investors.</p>",
    ))
}

#[get("/invest")]
async fn invest() -> HttpResponse {
    html(layout(
        "Invest",
        "<h1>Invest</h1>\n\
         <p>Fund verified borrowers and spread your money across many loans.</p>",
    ))
}

#[get("/about-us")]
async fn about_us(db: web::Data<DatabaseConnection>) -> Result<HttpResponse> {
    let members = list_team_members(db.get_ref()).await?;
    Ok(html(layout(
        "About us",
        &format!(
            "<h1>About us</h1>\n\
             <p>VigoLend is built by a small team of lenders, engineers and compliance \
             specialists.</p>\n{}",
            render_team(&members)
        ),
    )))
}

#[get("/our-team")]
async fn our_team(db: web::Data<DatabaseConnection>) -> Result<HttpResponse> {
    let members = list_team_members(db.get_ref()).await?;
    Ok(html(layout(
        "Our team",
        &format!("<h1>Our team</h1>\n{}", render_team(&members)),
    )))
}

/// Registers the content routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home)
        .service(borrow)
        .service(invest)
        .service(about_us)
        .service(our_team);
}
