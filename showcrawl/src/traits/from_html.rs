/// Builds an item out of the rendered source of a single page.
pub trait FromHTML {
    type Error;
    type Output;
    fn from_html(url: &str, html: &str) -> Result<Self::Output, Self::Error>
    where
        Self: Sized;
}
