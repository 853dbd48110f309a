//! Response shapes shared by several endpoints

use crowns_common::progress::{completion, status, Carousel, Status};
use crowns_common::record::{Collection, Record};
use crowns_common::slug::{monster_image_path, PLACEHOLDER_IMAGE};
use crowns_common::store::PublicProfile;
use serde::Serialize;
use std::path::Path;

/// Image for a record: its artwork when the assets folder has it,
/// otherwise the placeholder
pub fn resolve_image(assets_path: &Path, name: &str) -> String {
    let path = monster_image_path(name);
    if assets_path.join(path.trim_start_matches('/')).is_file() {
        path
    } else {
        PLACEHOLDER_IMAGE.to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: String,
    pub name: String,
    pub small: bool,
    pub large: bool,
    pub status: Status,
    pub status_label: &'static str,
    pub image: String,
}

impl RecordView {
    pub fn new(record: &Record, assets_path: &Path) -> Self {
        let status = status(record);
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            small: record.small,
            large: record.large,
            status,
            status_label: status.label(),
            image: resolve_image(assets_path, &record.name),
        }
    }
}

/// One position of a carousel over a collection
#[derive(Debug, Serialize)]
pub struct CarouselView {
    pub index: usize,
    pub total: usize,
    pub prev: usize,
    pub next: usize,
    pub record: Option<RecordView>,
    /// Records with both crowns
    pub complete: usize,
}

impl CarouselView {
    pub fn new(rows: &Collection, index: usize, assets_path: &Path) -> Self {
        let carousel = Carousel::new(rows.len(), index);
        let (complete, total) = completion(rows);
        Self {
            index: carousel.index(),
            total,
            prev: carousel.prev(),
            next: carousel.next(),
            record: carousel
                .current(rows)
                .map(|record| RecordView::new(record, assets_path)),
            complete,
        }
    }
}

/// A published user as listed in the directory
#[derive(Debug, Serialize)]
pub struct FriendView {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub photo_url: String,
}

impl FriendView {
    pub fn new(uid: &str, profile: &PublicProfile) -> Self {
        let photo_url = if profile.photo_url.is_empty() {
            PLACEHOLDER_IMAGE.to_string()
        } else {
            profile.photo_url.clone()
        };
        Self {
            uid: uid.to_string(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            photo_url,
        }
    }
}
