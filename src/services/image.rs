//! Image service proxy
//!
//! Image data transfer goes through `images/<id>/file`. Downloads are checked
//! against the MD5 checksum the server reports, either in a `Content-MD5`
//! header or as the image's `checksum` attribute.

use crate::error::{Error, Result};
use crate::proxy::{BaseProxy, ResourceRef};
use crate::resource::{Attrs, Resource, ResourceStream};
use crate::session::RequestOptions;
use md5::{Digest, Md5};
use reqwest::Method;

pub const IMAGE: &str = "image.image";

#[derive(Clone, Debug)]
pub struct ImageProxy {
    base: BaseProxy,
}

impl ImageProxy {
    pub fn new(base: BaseProxy) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BaseProxy {
        &self.base
    }

    pub async fn create_image(&self, attrs: Attrs) -> Result<Resource> {
        self.base.create_with(IMAGE, attrs, false).await
    }

    pub async fn get_image(&self, image: impl Into<ResourceRef>) -> Result<Resource> {
        self.base.get(IMAGE, image).await
    }

    pub async fn update_image(&self, image: impl Into<ResourceRef>, attrs: Attrs) -> Result<Resource> {
        self.base.update_with(IMAGE, image, attrs, false).await
    }

    pub async fn delete_image(&self, image: impl Into<ResourceRef>, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.delete(IMAGE, image, ignore_missing).await
    }

    pub async fn find_image(&self, name_or_id: &str, ignore_missing: bool) -> Result<Option<Resource>> {
        self.base.find(IMAGE, name_or_id, ignore_missing, Attrs::new()).await
    }

    pub fn images(&self, query: Attrs) -> Result<ResourceStream<'_>> {
        self.base.list(IMAGE, true, query)
    }

    pub async fn deactivate_image(&self, image: impl Into<ResourceRef>) -> Result<()> {
        self.image_action(image, "deactivate").await
    }

    pub async fn reactivate_image(&self, image: impl Into<ResourceRef>) -> Result<()> {
        self.image_action(image, "reactivate").await
    }

    async fn image_action(&self, image: impl Into<ResourceRef>, action: &str) -> Result<()> {
        let image = self.base.get_resource(IMAGE, image, Attrs::new())?;
        tracing::info!("Image {} {}", image.id().unwrap_or_default(), action);
        self.base
            .resource_request(Method::POST, &image, &["actions", action], RequestOptions::new())
            .await?;
        Ok(())
    }

    pub async fn add_tag(&self, image: impl Into<ResourceRef>, tag: &str) -> Result<()> {
        let image = self.base.get_resource(IMAGE, image, Attrs::new())?;
        self.base
            .resource_request(Method::PUT, &image, &["tags", tag], RequestOptions::new())
            .await?;
        Ok(())
    }

    pub async fn remove_tag(&self, image: impl Into<ResourceRef>, tag: &str) -> Result<()> {
        let image = self.base.get_resource(IMAGE, image, Attrs::new())?;
        self.base
            .resource_request(Method::DELETE, &image, &["tags", tag], RequestOptions::new())
            .await?;
        Ok(())
    }

    /// Upload raw image data into an existing image
    pub async fn upload_image(&self, image: impl Into<ResourceRef>, data: Vec<u8>) -> Result<()> {
        let image = self.base.get_resource(IMAGE, image, Attrs::new())?;
        tracing::info!("Uploading {} bytes to image {}", data.len(), image.id().unwrap_or_default());
        let opts = RequestOptions::new()
            .data(data)
            .header("Content-Type", "application/octet-stream")
            .header("Accept", "");
        self.base
            .resource_request(Method::PUT, &image, &["file"], opts)
            .await?;
        Ok(())
    }

    /// Download image data, verifying its MD5 checksum when one is known
    pub async fn download_image(&self, image: impl Into<ResourceRef>) -> Result<Vec<u8>> {
        let image = self.base.get_resource(IMAGE, image, Attrs::new())?;
        let response = self
            .base
            .resource_request(Method::GET, &image, &["file"], RequestOptions::new())
            .await?;

        let checksum = match response.header("Content-MD5") {
            Some(checksum) => Some(checksum.to_string()),
            None => image
                .clone()
                .get(self.base.session(), true)
                .await?
                .attr_as::<String>("checksum"),
        };

        match checksum {
            Some(checksum) => verify_checksum(&checksum, &response.body)?,
            None => tracing::warn!(
                "Unable to verify the integrity of image {}",
                image.id().unwrap_or_default()
            ),
        }
        Ok(response.body)
    }
}

fn verify_checksum(expected: &str, data: &[u8]) -> Result<()> {
    let digest = hex::encode(Md5::digest(data));
    if digest != expected {
        return Err(Error::InvalidResponse(format!(
            "checksum mismatch: {} != {}",
            expected, digest
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_checksum() {
        // md5("abc")
        assert!(verify_checksum("900150983cd24fb0d6963f7d28e17f72", b"abc").is_ok());
        let err = verify_checksum("deadbeef", b"abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid response: checksum mismatch: deadbeef != 900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
