mod coadd;
mod difference;
mod discovery;
mod extract;
mod photometry;
mod refstars;
mod subimage;

pub use coadd::Coaddition;
pub use difference::ImageDifferencing;
pub use discovery::{night_date, FindData};
pub use extract::SourceExtraction;
pub use photometry::Photometry;
pub use refstars::{select_template, ChooseRefstars};
pub use subimage::MakeSubimages;
