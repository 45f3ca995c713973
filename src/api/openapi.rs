use super::handlers::{auth, health, notes, sharelinks};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Endpoints registered here via `.routes(routes!(...))` are both served and
/// documented. Handlers sharing a path go in the same `routes!` call.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::session::register))
        .routes(routes!(auth::session::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(notes::list_notes, notes::create_note))
        .routes(routes!(notes::get_note, notes::update_note))
        .routes(routes!(sharelinks::create_share_link))
        .routes(routes!(sharelinks::get_share_link));

    router.get_openapi_mut().tags = Some(vec![
        tag("auth", "Registration and cookie sessions"),
        tag("notes", "Private notes of the logged-in user"),
        tag("sharelinks", "Public snapshots of notes"),
        tag("health", "Service and database health"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Title, version, contact and license come from Cargo.toml.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Only the first author is published.
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

/// Split `Name <email>` into its parts.
fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            optional_str(name),
            optional_str(email.trim_end().trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, "jotter");
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Jotter"));
        assert_eq!(contact.email.as_deref(), Some("team@jotter.dev"));

        let license = doc.info.license.map(|license| license.name);
        assert_eq!(license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/login",
            "/auth/logout",
            "/notes",
            "/notes/{id}",
            "/sharelinks",
            "/sharelinks/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn tags_are_described() {
        let tags = openapi().tags.unwrap_or_default();
        for name in ["auth", "notes", "sharelinks", "health"] {
            assert!(
                tags.iter()
                    .any(|tag| tag.name == name && tag.description.is_some()),
                "missing tag {name}"
            );
        }
    }

    #[test]
    fn parse_author_handles_missing_parts() {
        assert_eq!(
            parse_author("Jane <jane@example.com>"),
            (Some("Jane"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane"), (Some("Jane"), None));
        assert_eq!(parse_author("<a@b.c>"), (None, Some("a@b.c")));
        assert_eq!(parse_author(""), (None, None));
    }
}
