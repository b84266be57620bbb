//! Purpose: Name the record types of the IMDb dataset family and the schema of each.
//! Exports: `DatasetKind`, `schema_for`, `rows` (typed row structs).
//! Role: Schema owner for the built-in record types; resolved before any file is opened.
//! Invariants: Record type names match the dataset file names (`title.ratings`, ...).
//! Invariants: Unknown names fail with a `Config` error, never with a default schema.

pub mod rows;

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::Schema;
use crate::core::value::Converter;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DatasetKind {
    NameBasics,
    TitleAkas,
    TitleBasics,
    TitleCrew,
    TitleEpisode,
    TitlePrincipals,
    TitleRatings,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 7] = [
        DatasetKind::NameBasics,
        DatasetKind::TitleAkas,
        DatasetKind::TitleBasics,
        DatasetKind::TitleCrew,
        DatasetKind::TitleEpisode,
        DatasetKind::TitlePrincipals,
        DatasetKind::TitleRatings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::NameBasics => "name.basics",
            DatasetKind::TitleAkas => "title.akas",
            DatasetKind::TitleBasics => "title.basics",
            DatasetKind::TitleCrew => "title.crew",
            DatasetKind::TitleEpisode => "title.episode",
            DatasetKind::TitlePrincipals => "title.principals",
            DatasetKind::TitleRatings => "title.ratings",
        }
    }

    fn columns(self) -> &'static [(&'static str, Converter)] {
        use Converter::{Bool, Int, List, Real, Text};
        match self {
            DatasetKind::NameBasics => &[
                ("nconst", Text),
                ("primaryName", Text),
                ("birthYear", Int),
                ("deathYear", Int),
                ("primaryProfession", List),
                ("knownForTitles", List),
            ],
            DatasetKind::TitleAkas => &[
                ("titleId", Text),
                ("ordering", Int),
                ("title", Text),
                ("region", Text),
                ("language", Text),
                ("types", List),
                ("attributes", List),
                ("isOriginalTitle", Bool),
            ],
            DatasetKind::TitleBasics => &[
                ("tconst", Text),
                ("titleType", Text),
                ("primaryTitle", Text),
                ("originalTitle", Text),
                ("isAdult", Bool),
                ("startYear", Int),
                ("endYear", Int),
                ("runtimeMinutes", Int),
                ("genres", List),
            ],
            DatasetKind::TitleCrew => &[
                ("tconst", Text),
                ("directors", List),
                ("writers", List),
            ],
            DatasetKind::TitleEpisode => &[
                ("tconst", Text),
                ("parentTconst", Text),
                ("seasonNumber", Int),
                ("episodeNumber", Int),
            ],
            DatasetKind::TitlePrincipals => &[
                ("tconst", Text),
                ("ordering", Int),
                ("nconst", Text),
                ("category", Text),
                ("job", Text),
                ("characters", Text),
            ],
            DatasetKind::TitleRatings => &[
                ("tconst", Text),
                ("averageRating", Real),
                ("numVotes", Int),
            ],
        }
    }

    pub fn schema(self) -> Result<Schema, Error> {
        self.columns()
            .iter()
            .fold(Schema::builder(self.as_str()), |builder, (name, converter)| {
                builder.column(*name, *converter)
            })
            .build()
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                Error::new(ErrorKind::Config)
                    .with_message(format!("not a valid type: '{value}'"))
                    .with_hint(format!("Use one of: {}.", known_names().join(", ")))
            })
    }
}

pub fn schema_for(record_type: &str) -> Result<Schema, Error> {
    record_type.parse::<DatasetKind>()?.schema()
}

fn known_names() -> Vec<&'static str> {
    DatasetKind::ALL.iter().map(|kind| kind.as_str()).collect()
}
