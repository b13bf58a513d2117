use crate::compose::CompositeImage;
use crate::error::{PaperWalletError, Result};
use std::time::Duration;

/// Delay between the print page loading and the print dialog opening, so the
/// card images have painted.
pub const PRINT_DELAY: Duration = Duration::from_millis(500);

const PRINT_STYLES: &str = r#"
  @media print {
    @page {
      margin: 0;
      size: auto;
    }
    body {
      margin: 0;
      padding: 0;
      background: white;
    }
    .wallet-page {
      page-break-inside: avoid;
      break-inside: avoid;
      page-break-after: always;
      break-after: page;
      width: 100%;
      display: flex;
      align-items: center;
      justify-content: center;
      margin-bottom: 0;
      padding: 0;
    }
    .wallet-page:last-child {
      page-break-after: auto;
      break-after: auto;
    }
    .print-image {
      width: 100%;
      height: auto;
      max-width: 100%;
      object-fit: contain;
      page-break-inside: avoid;
      break-inside: avoid;
      display: block;
    }
  }
  * {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
  }
  body {
    margin: 0;
    padding: 0;
    background: white;
  }
  .wallet-page {
    width: 100%;
    display: flex;
    align-items: center;
    justify-content: center;
    margin-bottom: 0;
    padding: 0;
  }
  .print-image {
    max-width: 100%;
    width: auto;
    height: auto;
    object-fit: contain;
    display: block;
  }
  @media screen {
    body {
      background: #f0f0f0;
      padding: 20px;
    }
    .wallet-page {
      margin-bottom: 20px;
      padding: 20px;
      background: white;
      box-shadow: 0 0 10px rgba(0,0,0,0.1);
    }
  }
"#;

/// Standalone print page, one wallet card per printed page.
#[derive(Debug, Clone)]
pub struct PrintDocument {
    images: Vec<String>,
}

impl PrintDocument {
    pub fn from_images(images: &[CompositeImage]) -> Result<Self> {
        if images.is_empty() {
            return Err(PaperWalletError::NoWallets);
        }
        Ok(Self {
            images: images.iter().map(CompositeImage::to_data_url).collect(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.images.len()
    }

    pub fn to_html(&self) -> String {
        let pages = self
            .images
            .iter()
            .enumerate()
            .map(|(i, src)| {
                format!(
                    r#"    <div class="wallet-page">
      <img src="{}" class="print-image" alt="Bitcoin Wallet {}" />
    </div>"#,
                    src,
                    i + 1
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Bitcoin Wallet - Print</title>
    <style>{styles}</style>
  </head>
  <body>
{pages}
    <script>
      window.addEventListener('load', function () {{
        setTimeout(function () {{ window.print(); }}, {delay});
      }});
    </script>
  </body>
</html>
"#,
            styles = PRINT_STYLES,
            pages = pages,
            delay = PRINT_DELAY.as_millis()
        )
    }
}
