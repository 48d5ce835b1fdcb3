pub mod fetcher;

pub use fetcher::{
    download_version_manifest, fetch_catalogue, CatalogueEntry, VersionCatalogue, VersionSelector,
};
