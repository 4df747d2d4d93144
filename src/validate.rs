//! Input checks that run before any network call.

use crate::error::{ClientError, ClientResult};
use crate::models::{Credentials, ImageUpload, PostDraft, Registration};

pub const GENRES: [&str; 11] = [
    "Technology",
    "Health",
    "Lifestyle",
    "Finance",
    "Education",
    "Anime",
    "Books",
    "Art",
    "Manhwa",
    "Nature",
    "myths",
];

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Genre routes use the lower-cased name; the gateway percent-encodes it.
pub fn genre_slug(genre: &str) -> String {
    genre.trim().to_lowercase()
}

/// Canonical catalogue spelling for `genre`, if it is one we know.
pub fn known_genre(genre: &str) -> Option<&'static str> {
    let genre = genre.trim();
    GENRES.iter().copied().find(|g| g.eq_ignore_ascii_case(genre))
}

/// Returns the trimmed comment text.
pub fn comment(text: &str) -> ClientResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClientError::Validation("Comment cannot be empty!".into()));
    }
    Ok(text.to_string())
}

pub fn image(image: &ImageUpload) -> ClientResult<()> {
    if !image.content_type.starts_with("image/") {
        return Err(ClientError::Validation(
            "Only image files are allowed".into(),
        ));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ClientError::Validation("File size must be under 2MB".into()));
    }
    Ok(())
}

pub fn draft(draft: &PostDraft) -> ClientResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ClientError::Validation("Title is required".into()));
    }
    if draft.content.trim().is_empty() {
        return Err(ClientError::Validation("Content is required".into()));
    }
    if draft.genre.trim().is_empty() {
        return Err(ClientError::Validation("Please select a genre".into()));
    }
    if known_genre(&draft.genre).is_none() {
        return Err(ClientError::Validation(format!(
            "Unknown genre {}",
            draft.genre
        )));
    }
    if let Some(ref upload) = draft.image {
        image(upload)?;
    }
    Ok(())
}

pub fn registration(registration: &Registration) -> ClientResult<()> {
    if registration.username.chars().count() < 3 {
        return Err(ClientError::Validation(
            "Username must be at least 3 characters!".into(),
        ));
    }
    if !registration.email.contains('@') {
        return Err(ClientError::Validation(
            "Please enter a valid email!".into(),
        ));
    }
    if registration.password.chars().count() < 6 {
        return Err(ClientError::Validation(
            "Password must be at least 6 characters!".into(),
        ));
    }
    Ok(())
}

pub fn credentials(credentials: &Credentials) -> ClientResult<()> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ClientError::Validation(
            "Email and password are required".into(),
        ));
    }
    Ok(())
}
