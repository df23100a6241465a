//! actix-web routes that serve the files written by a [`MediaStore`].

use crate::media::MediaStore;
use actix_web::{web, HttpResponse};
use std::path::Path;

/// Registers `GET /images/{filename}` and `GET /videos/{filename}`.
///
/// Expects the store as `web::Data<MediaStore>` app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/images/{filename}", web::get().to(get_image))
        .route("/videos/{filename}", web::get().to(get_video));
}

async fn get_image(store: web::Data<MediaStore>, filename: web::Path<String>) -> HttpResponse {
    serve(store.image_dir(), &filename).await
}

async fn get_video(store: web::Data<MediaStore>, filename: web::Path<String>) -> HttpResponse {
    serve(store.video_dir(), &filename).await
}

async fn serve(dir: &Path, filename: &str) -> HttpResponse {
    if !is_plain_filename(filename) {
        log::warn!("Rejected media path {:?}", filename);
        return HttpResponse::BadRequest().body("invalid filename");
    }

    match tokio::fs::read(dir.join(filename)).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(content_type(filename))
            .body(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HttpResponse::NotFound().finish(),
        Err(e) => {
            log::error!("Failed to read {}: {}", filename, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains("..") && !name.contains(|c: char| c == '/' || c == '\\')
}

fn content_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
