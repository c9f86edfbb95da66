//! Server-rendered pages. No template engine: each page is a small body
//! fragment wrapped in a shared layout, with all user-supplied text escaped.

use axum::response::Html;
use tower_sessions::Session;

use super::WebError;
use super::flash::{self, Flash};
use super::forms::{FieldErrors, LoginForm, ProfileForm, RegistrationForm};
use crate::db::User;
use crate::entities::accounts;

const STYLE: &str = "\
body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem;color:#222}\
nav a{margin-right:1rem}\
label{display:block;margin:.75rem 0}\
input{display:block;padding:.4rem;width:100%;max-width:20rem}\
button{margin-top:1rem;padding:.5rem 1.5rem}\
table{border-collapse:collapse;margin-top:1rem}\
td,th{border:1px solid #ccc;padding:.4rem .8rem;text-align:left}\
.flash{padding:.75rem 1rem;margin:1rem 0;border-radius:4px}\
.flash-success{background:#d7f0d7;color:#1d5e1d}\
.flash-danger{background:#f5d5d5;color:#7a1f1f}\
.field-error{display:block;color:#a33;font-size:.85rem}";

pub(crate) fn layout(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    let mut flash_html = String::new();
    for flash in flashes {
        flash_html.push_str(&format!(
            "<div class=\"flash {}\">{}</div>\n",
            flash.level.css_class(),
            html_escape::encode_text(&flash.message)
        ));
    }

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"no\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} – Nettbank</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><a href=\"/\">Hjem</a><a href=\"/login\">Logg inn</a>\
         <a href=\"/register\">Registrer deg</a><a href=\"/account\">Min side</a>\
         <a href=\"/myaccs\">Mine kontoer</a><a href=\"/logout\">Logg ut</a></nav>\n\
         {flash_html}<main>\n{body}\n</main>\n</body>\n</html>\n",
        html_escape::encode_text(title),
    ))
}

fn field(
    label: &str,
    name: &'static str,
    input_type: &str,
    value: &str,
    errors: &FieldErrors,
) -> String {
    let error = errors.for_field(name).map_or_else(String::new, |msg| {
        format!(
            "<span class=\"field-error\">{}</span>",
            html_escape::encode_text(msg)
        )
    });

    format!(
        "<label>{label}<input type=\"{input_type}\" name=\"{name}\" value=\"{}\">{error}</label>\n",
        html_escape::encode_double_quoted_attribute(value)
    )
}

/// GET / — landing page. Rate-limited clients are redirected here, so the
/// flash banner has to render.
pub async fn index(session: Session) -> Result<Html<String>, WebError> {
    let flashes = flash::take(&session).await?;
    Ok(layout(
        "Velkommen",
        &flashes,
        "<h1>Velkommen til Nettbank</h1>\
         <p>Logg inn for å se kontoene dine, eller registrer deg som ny kunde.</p>",
    ))
}

pub(crate) fn login_page(
    flashes: &[Flash],
    next: Option<&str>,
    form: &LoginForm,
    errors: &FieldErrors,
) -> Html<String> {
    let action = next.map_or_else(
        || "/login".to_string(),
        |n| format!("/login?next={}", urlencoding::encode(n)),
    );

    let body = format!(
        "<h1>Logg inn</h1>\n<form method=\"post\" action=\"{}\">\n{}{}\
         <button type=\"submit\">Logg inn</button>\n</form>\n\
         <p>Ny kunde? <a href=\"/register\">Registrer deg her</a>.</p>",
        html_escape::encode_double_quoted_attribute(&action),
        field("Brukernavn", "username", "text", &form.username, errors),
        field("Passord", "password", "password", "", errors),
    );

    layout("Logg inn", flashes, &body)
}

pub(crate) fn register_page(
    flashes: &[Flash],
    form: &RegistrationForm,
    errors: &FieldErrors,
) -> Html<String> {
    let body = format!(
        "<h1>Registrer deg</h1>\n<form method=\"post\" action=\"/register\">\n{}{}{}{}{}\
         <button type=\"submit\">Registrer</button>\n</form>",
        field("Brukernavn", "username", "text", &form.username, errors),
        field("E-post", "email", "email", &form.email, errors),
        field("Passord", "password", "password", "", errors),
        field("Telefon", "phone", "tel", &form.phone, errors),
        field("Adresse", "address", "text", &form.address, errors),
    );

    layout("Registrer deg", flashes, &body)
}

pub(crate) fn edit_profile_page(
    flashes: &[Flash],
    form: &ProfileForm,
    errors: &FieldErrors,
) -> Html<String> {
    let body = format!(
        "<h1>Endre opplysninger</h1>\n<form method=\"post\" action=\"/editprofile\">\n{}{}{}\
         <button type=\"submit\">Lagre</button>\n</form>",
        field("E-post", "email", "email", &form.email, errors),
        field("Telefon", "phone", "tel", &form.phone, errors),
        field("Adresse", "address", "text", &form.address, errors),
    );

    layout("Endre opplysninger", flashes, &body)
}

pub(crate) fn account_page(flashes: &[Flash], user: &User) -> Html<String> {
    let username = user.username.as_deref().unwrap_or("–");
    let body = format!(
        "<h1>Min side</h1>\n<table>\n\
         <tr><th>Brukernavn</th><td>{}</td></tr>\n\
         <tr><th>E-post</th><td>{}</td></tr>\n\
         <tr><th>Telefon</th><td>{}</td></tr>\n\
         <tr><th>Adresse</th><td>{}</td></tr>\n\
         </table>\n<p><a href=\"/editprofile\">Endre opplysninger</a></p>",
        html_escape::encode_text(username),
        html_escape::encode_text(&user.email),
        html_escape::encode_text(&user.phone),
        html_escape::encode_text(&user.address),
    );

    layout("Min side", flashes, &body)
}

pub(crate) fn accounts_page(flashes: &[Flash], rows: &[accounts::Model]) -> Html<String> {
    let mut table = String::from("<h1>Mine kontoer</h1>\n<table>\n<tr><th>Konto</th><th>Saldo</th></tr>\n");
    for account in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            html_escape::encode_text(&account.name),
            format_kroner(account.balance_ore),
        ));
    }
    table.push_str("</table>");

    layout("Mine kontoer", flashes, &table)
}

pub(crate) fn error_page() -> Html<String> {
    layout(
        "Feil",
        &[],
        "<h1>Noe gikk galt</h1><p>Prøv igjen senere.</p>",
    )
}

/// Render an øre amount as kroner, e.g. `123456` → `1 234,56 kr`.
fn format_kroner(ore: i64) -> String {
    let sign = if ore < 0 { "-" } else { "" };
    let ore = ore.abs();
    let kroner = ore / 100;
    let rest = ore % 100;

    let digits = kroner.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    format!("{sign}{grouped},{rest:02} kr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::flash::Level;

    #[test]
    fn kroner_formatting() {
        assert_eq!(format_kroner(0), "0,00 kr");
        assert_eq!(format_kroner(5), "0,05 kr");
        assert_eq!(format_kroner(123_456), "1 234,56 kr");
        assert_eq!(format_kroner(100_000_000), "1 000 000,00 kr");
        assert_eq!(format_kroner(-9950), "-99,50 kr");
    }

    #[test]
    fn layout_escapes_flash_messages() {
        let flashes = vec![Flash {
            level: Level::Danger,
            message: "<script>alert(1)</script>".to_string(),
        }];
        let Html(html) = layout("t", &flashes, "");
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn form_values_are_attribute_escaped() {
        let form = RegistrationForm {
            username: "\"><img src=x>".to_string(),
            ..RegistrationForm::default()
        };
        let Html(html) = register_page(&[], &form, &FieldErrors::default());
        assert!(!html.contains("\"><img"));
    }
}
