use crate::config::AppConfig;
use crate::error::AppError;
use crate::ingest::{ingest_batch, IncomingFile};
use crate::media::{safe_filename, MediaKind};
use crate::thumbnail::ThumbnailCache;
use crate::walker::{self, resolve_in_root};
use actix_files::NamedFile;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use std::path::Path;

const MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

#[derive(Deserialize)]
struct DirQuery {
    #[serde(default)]
    path: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    path: String,
    q: String,
}

fn default_sort() -> bool {
    true
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    dir: String,
    name: String,
    /// `sort=false` skips classification and leaves the file in place.
    #[serde(default = "default_sort")]
    sort: bool,
}

#[derive(Deserialize)]
struct CreateFolderRequest {
    #[serde(default)]
    path: String,
    name: String,
}

#[derive(Deserialize)]
struct RenameRequest {
    path: String,
    new_name: String,
}

async fn list_dir(
    config: web::Data<AppConfig>,
    query: web::Query<DirQuery>,
) -> Result<HttpResponse, AppError> {
    let rel = query.into_inner().path;
    let items = web::block(move || walker::list_dir(&config, &rel)).await??;
    Ok(HttpResponse::Ok().json(items))
}

async fn browse_category(
    config: web::Data<AppConfig>,
    category: web::Path<String>,
    query: web::Query<DirQuery>,
) -> Result<HttpResponse, AppError> {
    let kind = match category.as_str() {
        "image" => MediaKind::Image,
        "video" => MediaKind::Video,
        other => return Err(AppError::NotFound(format!("category {}", other))),
    };
    let rel = query.into_inner().path;
    let items = web::block(move || {
        walker::walk_media(&config, &rel, kind).map(|iter| {
            let mut items: Vec<_> = iter.collect();
            items.sort_by_key(|i| i.name.to_lowercase());
            items
        })
    })
    .await??;
    Ok(HttpResponse::Ok().json(items))
}

async fn search(
    config: web::Data<AppConfig>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let SearchQuery { path, q } = query.into_inner();
    let items = web::block(move || walker::search(&config, &path, &q)).await??;
    Ok(HttpResponse::Ok().json(items))
}

async fn storage_info(config: web::Data<AppConfig>) -> Result<HttpResponse, AppError> {
    let stats = web::block(move || walker::storage_stats(&config.storage_root)).await?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn get_thumbnail(
    config: web::Data<AppConfig>,
    cache: web::Data<ThumbnailCache>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let rel = path.into_inner();
    log::debug!("Thumbnail request for {:?}", rel);

    let thumb = web::block(move || {
        let abs = resolve_in_root(&config.storage_root, &rel)?;
        if !abs.is_file() {
            return Err(AppError::NotFound(rel));
        }
        let kind = MediaKind::from_path(&config, &abs);
        cache.get(&abs, kind)
    })
    .await??;

    Ok(HttpResponse::Ok()
        .content_type(thumb.content_type)
        .body(thumb.bytes))
}

/// Inline preview with a guessed content type; the browser decides how to
/// render it.
async fn preview_file(
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<NamedFile, AppError> {
    let rel = path.into_inner();
    let abs = resolve_in_root(&config.storage_root, &rel)?;
    if !abs.is_file() {
        return Err(AppError::NotFound(rel));
    }
    let mime = mime_guess::from_path(&abs).first_or(mime::APPLICATION_OCTET_STREAM);
    Ok(NamedFile::open_async(&abs)
        .await
        .map_err(AppError::Io)?
        .set_content_type(mime))
}

async fn download_file(
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<NamedFile, AppError> {
    let rel = path.into_inner();
    let abs = resolve_in_root(&config.storage_root, &rel)?;
    if !abs.is_file() {
        return Err(AppError::NotFound(rel));
    }
    Ok(NamedFile::open_async(&abs).await.map_err(AppError::Io)?)
}

async fn upload(
    config: web::Data<AppConfig>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let UploadQuery { dir, name, sort } = query.into_inner();
    let summary = web::block(move || {
        let upload_dir = resolve_in_root(&config.storage_root, &dir)?;
        let files = vec![IncomingFile {
            file_name: name,
            bytes: body.to_vec(),
        }];
        Ok::<_, AppError>(ingest_batch(&config, &upload_dir, files, sort))
    })
    .await??;
    Ok(HttpResponse::Ok().json(summary))
}

async fn create_folder(
    config: web::Data<AppConfig>,
    request: web::Json<CreateFolderRequest>,
) -> Result<HttpResponse, AppError> {
    let CreateFolderRequest { path, name } = request.into_inner();
    let name = safe_filename(&name);
    let parent = resolve_in_root(&config.storage_root, &path)?;
    let target = parent.join(&name);
    if target.exists() {
        return Err(AppError::AlreadyExists(name));
    }
    std::fs::create_dir_all(&target)?;
    Ok(HttpResponse::Created().finish())
}

async fn rename(
    config: web::Data<AppConfig>,
    request: web::Json<RenameRequest>,
) -> Result<HttpResponse, AppError> {
    let RenameRequest { path, new_name } = request.into_inner();
    let old_abs = resolve_in_root(&config.storage_root, &path)?;
    if !old_abs.exists() {
        return Err(AppError::NotFound(path));
    }

    // Files keep their original extension no matter what the client sent.
    let mut new_name = safe_filename(&new_name);
    if old_abs.is_file() {
        if let Some(old_ext) = old_abs.extension().and_then(|e| e.to_str()) {
            let stem = Path::new(&new_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&new_name)
                .to_string();
            new_name = format!("{}.{}", stem, old_ext);
        }
    }

    let parent = old_abs.parent().unwrap_or(&config.storage_root);
    let new_abs = parent.join(&new_name);
    if new_abs.exists() {
        return Err(AppError::AlreadyExists(new_name));
    }
    std::fs::rename(&old_abs, &new_abs)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "name": new_name })))
}

async fn delete(
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let rel = path.into_inner();
    let abs = resolve_in_root(&config.storage_root, &rel)?;
    if !abs.exists() {
        return Err(AppError::NotFound(rel));
    }
    if abs.is_dir() {
        std::fs::remove_dir_all(&abs)?;
    } else {
        std::fs::remove_file(&abs)?;
    }
    Ok(HttpResponse::NoContent().finish())
}

pub async fn start_web_server(config: AppConfig) -> std::io::Result<()> {
    let port = config.web_port;
    let cache = web::Data::new(ThumbnailCache::new(&config));
    let config_data = web::Data::new(config);

    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(cache.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .service(web::resource("/api/list").to(list_dir))
            .service(web::resource("/api/category/{category}").to(browse_category))
            .service(web::resource("/api/search").to(search))
            .service(web::resource("/api/storage").to(storage_info))
            .service(web::resource("/api/thumb/{path:.*}").route(web::get().to(get_thumbnail)))
            .service(web::resource("/api/preview/{path:.*}").route(web::get().to(preview_file)))
            .service(web::resource("/api/download/{path:.*}").route(web::get().to(download_file)))
            .service(web::resource("/api/upload").route(web::post().to(upload)))
            .service(web::resource("/api/folder").route(web::post().to(create_folder)))
            .service(web::resource("/api/rename").route(web::post().to(rename)))
            .service(web::resource("/api/file/{path:.*}").route(web::delete().to(delete)))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
