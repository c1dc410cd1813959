//! HTML scraping for the login form, docket sheets and document
//! interstitials.

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static INPUT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input").unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static BOLD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("b").unwrap());
static DOC_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src], a[href], form[action]").unwrap());

static JUDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Magistrate Judge|Judge)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap()
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3}[.-]?\d{3}[.-]?\d{4}").unwrap());

const FIRM_MARKERS: [&str; 11] = [
    "LLP", "LLC", "PC", "P.C.", "Law", "PLLC", "L.L.C.", "Firm", "Office", "& ", "Group",
];

pub const LOGIN_BUTTON: &str = "loginForm:fbtnLogin";

/// A login form ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a form action the way the login site expects: absolute urls as-is,
/// host-relative paths against the page origin, anything else posts back to
/// the page itself.
pub fn resolve_action(action: Option<&str>, page_url: &Url) -> String {
    match action.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) if a.starts_with("http://") || a.starts_with("https://") => a.to_string(),
        Some(a) if a.starts_with('/') => format!("{}{}", page_url.origin().ascii_serialization(), a),
        _ => page_url.to_string(),
    }
}

/// Harvest hidden fields and the submit control, then fill credentials.
/// Returns `None` when the page has no form.
pub fn parse_login_form(html: &str, page_url: &Url, username: &str, password: &str) -> Option<LoginForm> {
    let doc = Html::parse_document(html);
    let forms: Vec<ElementRef<'_>> = doc.select(&FORM).collect();
    let form = forms
        .iter()
        .find(|f| {
            let attrs = [f.value().id(), f.value().attr("name")];
            attrs.iter().flatten().any(|v| v.contains("loginForm"))
        })
        .or_else(|| forms.first())
        .copied()?;

    let mut fields: Vec<(String, String)> = Vec::new();
    let mut username_field: Option<String> = None;
    let mut password_field: Option<String> = None;

    for input in form.select(&INPUT) {
        let el = input.value();
        let Some(name) = el.attr("name") else { continue };
        let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
        let id = el.id().unwrap_or_default();
        let lname = name.to_lowercase();

        match kind.as_str() {
            "hidden" => {
                if let Some(value) = el.attr("value") {
                    fields.push((name.to_string(), value.to_string()));
                }
            }
            "submit" => fields.push((name.to_string(), el.attr("value").unwrap_or_default().to_string())),
            "password" => {
                if id == "loginForm:password" || password_field.is_none() {
                    password_field = Some(name.to_string());
                }
            }
            _ => {
                if id == "loginForm:loginName" {
                    username_field = Some(name.to_string());
                } else if id == "loginForm:password" {
                    password_field = Some(name.to_string());
                } else if lname.contains("password") && lname.contains("loginform") {
                    password_field.get_or_insert_with(|| name.to_string());
                } else if lname.contains("loginform") {
                    username_field.get_or_insert_with(|| name.to_string());
                }
            }
        }
    }

    let username_field = username_field.unwrap_or_else(|| "login".to_string());
    let password_field = password_field.unwrap_or_else(|| "password".to_string());
    fields.retain(|(name, _)| name != &username_field && name != &password_field);
    fields.push((username_field, username.to_string()));
    fields.push((password_field, password.to_string()));
    if !fields.iter().any(|(name, _)| name == LOGIN_BUTTON) {
        fields.push((LOGIN_BUTTON.to_string(), LOGIN_BUTTON.to_string()));
    }

    Some(LoginForm {
        action: resolve_action(form.value().attr("action"), page_url),
        fields,
    })
}

/// Action of the first form on the page, resolved against the page url.
pub fn form_action(html: &str, page_url: &Url) -> Option<String> {
    let doc = Html::parse_document(html);
    let form = doc.select(&FORM).next()?;
    let action = form.value().attr("action").map(str::trim).unwrap_or_default();
    if action.is_empty() {
        return Some(page_url.to_string());
    }
    page_url.join(action).ok().map(|u| u.to_string())
}

/// First `/doc1/` link on an interstitial page: iframe src, anchor href or
/// form action.
pub fn find_document_link(html: &str, page_url: &Url) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&DOC_LINKS).find_map(|el| {
        let v = el.value();
        let target = v.attr("src").or_else(|| v.attr("href")).or_else(|| v.attr("action"))?;
        if !target.contains("/doc1/") {
            return None;
        }
        page_url.join(target).ok().map(|u| u.to_string())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketEntry {
    pub date_filed: String,
    pub number: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attorney {
    pub name: String,
    pub firm: Option<String>,
    pub party_type: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocket {
    pub title: Option<String>,
    pub judge: Option<String>,
    pub entries: Vec<DocketEntry>,
    pub attorneys: Vec<Attorney>,
}

pub fn parse_docket(html: &str) -> ParsedDocket {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&HEADING)
        .map(text_of)
        .find(|t| !t.is_empty());

    let judge = doc.root_element().text().find_map(|t| {
        JUDGE
            .captures(t)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    });

    ParsedDocket {
        title,
        judge,
        entries: parse_entries(&doc),
        attorneys: parse_attorneys(&doc),
    }
}

fn parse_entries(doc: &Html) -> Vec<DocketEntry> {
    let Some(table) = doc.select(&TABLE).find(|table| {
        table
            .select(&ROW)
            .next()
            .map(|row| text_of(row).to_lowercase())
            .is_some_and(|h| h.contains("date filed") && h.contains("docket text"))
    }) else {
        return Vec::new();
    };

    table
        .select(&ROW)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL).map(text_of).collect();
            if cells.len() < 3 || cells[0].is_empty() || cells[2].is_empty() {
                return None;
            }
            Some(DocketEntry {
                date_filed: cells[0].clone(),
                number: Some(cells[1].clone()).filter(|n| !n.is_empty()),
                text: cells[2].clone(),
            })
        })
        .collect()
}

fn party_type(text: &str) -> Option<&'static str> {
    [
        ("plaintiff", "Plaintiff"),
        ("defendant", "Defendant"),
        ("petitioner", "Petitioner"),
        ("respondent", "Respondent"),
    ]
    .into_iter()
    .find(|(marker, _)| text.contains(marker))
    .map(|(_, label)| label)
}

/// Attorneys sit in the cell after a "represented by" cell, name in bold.
fn parse_attorneys(doc: &Html) -> Vec<Attorney> {
    let mut attorneys = Vec::new();
    let mut seen = HashSet::new();
    let mut current_party: Option<&'static str> = None;

    for td in doc.select(&TD) {
        let text = text_of(td).to_lowercase();
        if let Some(party) = party_type(&text) {
            current_party = Some(party);
        }
        if !text.contains("represented by") {
            continue;
        }

        let Some(next) = td.next_siblings().filter_map(ElementRef::wrap).find(|e| e.value().name() == "td") else {
            continue;
        };
        let Some(name) = next.select(&BOLD).next().map(text_of).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !seen.insert(name.to_lowercase()) {
            continue;
        }

        let mut attorney = Attorney {
            name: name.clone(),
            firm: None,
            party_type: current_party.map(str::to_string),
            email: None,
            phone: None,
        };
        let lines = next
            .text()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty() && *l != name);
        for line in lines {
            if line.contains('@') {
                attorney.email = Some(line.replace("Email:", "").trim().to_string());
            } else if FIRM_MARKERS.iter().any(|m| line.contains(m)) {
                attorney.firm.get_or_insert(line);
            } else if PHONE.is_match(&line) {
                attorney.phone = Some(line);
            }
        }
        attorneys.push(attorney);
    }
    attorneys
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r#"
<html><head><title>PACER: Login</title></head><body>
<form id="loginForm" name="loginForm" method="post" action="/csologin/login.jsf">
  <input type="hidden" name="loginForm" value="loginForm">
  <input type="hidden" name="javax.faces.ViewState" value="-123:456">
  <input type="hidden" name="noValue">
  <input type="text" id="loginForm:loginName" name="loginForm:loginName">
  <input type="password" id="loginForm:password" name="loginForm:password">
  <input type="text" name="loginForm:clientCode">
  <input type="submit" name="loginForm:fbtnLogin" value="Login">
</form></body></html>"#;

    fn page() -> Url {
        Url::parse("https://pacer.login.uscourts.gov/csologin/login.jsf?pscCourtId=CACDC").unwrap()
    }

    fn field<'a>(form: &'a LoginForm, name: &str) -> Option<&'a str> {
        form.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_parse_login_form() {
        let form = parse_login_form(LOGIN_PAGE, &page(), "alice", "secret").unwrap();
        assert_eq!(form.action, "https://pacer.login.uscourts.gov/csologin/login.jsf");
        assert_eq!(field(&form, "javax.faces.ViewState"), Some("-123:456"));
        assert_eq!(field(&form, "loginForm"), Some("loginForm"));
        assert_eq!(field(&form, "loginForm:loginName"), Some("alice"));
        assert_eq!(field(&form, "loginForm:password"), Some("secret"));
        assert_eq!(field(&form, "loginForm:fbtnLogin"), Some("Login"));
        assert_eq!(field(&form, "noValue"), None);
        assert_eq!(form.fields.iter().filter(|(n, _)| n == LOGIN_BUTTON).count(), 1);
    }

    #[test]
    fn test_login_form_defaults() {
        let html = r#"<form><input type="text" name="q"></form>"#;
        let form = parse_login_form(html, &page(), "u", "p").unwrap();
        assert_eq!(form.action, page().to_string());
        assert_eq!(field(&form, "login"), Some("u"));
        assert_eq!(field(&form, "password"), Some("p"));
        assert_eq!(field(&form, LOGIN_BUTTON), Some(LOGIN_BUTTON));
    }

    #[test]
    fn test_no_form() {
        assert!(parse_login_form("<html>down for maintenance</html>", &page(), "u", "p").is_none());
    }

    #[test]
    fn test_resolve_action() {
        let p = page();
        assert_eq!(resolve_action(Some("https://other.example/x"), &p), "https://other.example/x");
        assert_eq!(resolve_action(Some("/a/b"), &p), "https://pacer.login.uscourts.gov/a/b");
        assert_eq!(resolve_action(Some("relative.jsf"), &p), p.to_string());
        assert_eq!(resolve_action(None, &p), p.to_string());
    }

    #[test]
    fn test_form_action_relative() {
        let page = Url::parse("https://ecf.cand.uscourts.gov/cgi-bin/DktRpt.pl?428464").unwrap();
        let html = r#"<form method="post" action="../cgi-bin/DktRpt.pl?1-L_1_0-1"></form>"#;
        assert_eq!(
            form_action(html, &page).as_deref(),
            Some("https://ecf.cand.uscourts.gov/cgi-bin/DktRpt.pl?1-L_1_0-1")
        );
        assert!(form_action("<p>no form</p>", &page).is_none());
    }

    #[test]
    fn test_find_document_link() {
        let base = Url::parse("https://ecf.cacd.uscourts.gov/doc1/031123").unwrap();
        let html = r#"<a href="/help">help</a><iframe src="/doc1/031123?pdf_header=1&magic=1"></iframe>"#;
        assert_eq!(
            find_document_link(html, &base).as_deref(),
            Some("https://ecf.cacd.uscourts.gov/doc1/031123?pdf_header=1&magic=1")
        );
        assert!(find_document_link("<a href='/x'>x</a>", &base).is_none());
    }

    const DOCKET: &str = r#"
<html><body>
<h3>U.S. District Court<br>CIVIL DOCKET FOR CASE #: 2:24-cv-01234</h3>
<p>Smith v. Acme Corp</p>
<p>Assigned to: Judge John Walter Smith</p>
<table>
 <tr><td><b>Plaintiff</b></td></tr>
 <tr><td>Jane Smith</td><td>represented by</td>
     <td><b>Mary  Lawyer</b><br>Lawyer &amp; Partners LLP<br>213-555-1234<br>Email: mary@firm.com</td></tr>
 <tr><td><b>Defendant</b></td></tr>
 <tr><td>Acme Corp</td><td>represented by</td><td><b>Bob Counsel</b><br>Counsel Law Office</td></tr>
 <tr><td>Acme Holdings</td><td>represented by</td><td><b>Bob Counsel</b></td></tr>
</table>
<table>
 <tr><th>Date Filed</th><th>#</th><th>Docket Text</th></tr>
 <tr><td>01/02/2024</td><td>1</td><td>COMPLAINT against Acme Corp.</td></tr>
 <tr><td>01/03/2024</td><td></td><td>NOTICE of assignment.</td></tr>
 <tr><td></td><td>3</td><td>orphan</td></tr>
</table>
</body></html>"#;

    #[test]
    fn test_parse_docket() {
        let docket = parse_docket(DOCKET);
        assert_eq!(docket.title.as_deref(), Some("U.S. District Court CIVIL DOCKET FOR CASE #: 2:24-cv-01234"));
        assert_eq!(docket.judge.as_deref(), Some("John Walter Smith"));

        assert_eq!(docket.entries.len(), 2);
        assert_eq!(docket.entries[0].number.as_deref(), Some("1"));
        assert_eq!(docket.entries[1].number, None);
        assert_eq!(docket.entries[1].text, "NOTICE of assignment.");

        assert_eq!(docket.attorneys.len(), 2);
        let mary = &docket.attorneys[0];
        assert_eq!(mary.name, "Mary Lawyer");
        assert_eq!(mary.party_type.as_deref(), Some("Plaintiff"));
        assert_eq!(mary.firm.as_deref(), Some("Lawyer & Partners LLP"));
        assert_eq!(mary.phone.as_deref(), Some("213-555-1234"));
        assert_eq!(mary.email.as_deref(), Some("mary@firm.com"));
        assert_eq!(docket.attorneys[1].party_type.as_deref(), Some("Defendant"));
    }

    #[test]
    fn test_parse_docket_without_table() {
        let docket = parse_docket("<html><body>nothing here</body></html>");
        assert!(docket.entries.is_empty());
        assert!(docket.title.is_none());
    }
}
