// Typed rows for the catalog record types; build them with `Record::deserialize`.
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameBasics {
    pub nconst: String,
    pub primary_name: String,
    pub birth_year: Option<i64>,
    pub death_year: Option<i64>,
    pub primary_profession: Vec<String>,
    pub known_for_titles: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleAka {
    pub title_id: String,
    pub ordering: i64,
    pub title: String,
    pub region: Option<String>,
    pub language: Option<String>,
    pub types: Vec<String>,
    pub attributes: Vec<String>,
    pub is_original_title: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleBasics {
    pub tconst: String,
    pub title_type: String,
    pub primary_title: String,
    pub original_title: String,
    pub is_adult: Option<bool>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub runtime_minutes: Option<i64>,
    pub genres: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleCrew {
    pub tconst: String,
    pub directors: Vec<String>,
    pub writers: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleEpisode {
    pub tconst: String,
    pub parent_tconst: String,
    pub season_number: Option<i64>,
    pub episode_number: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitlePrincipal {
    pub tconst: String,
    pub ordering: i64,
    pub nconst: String,
    pub category: String,
    pub job: Option<String>,
    pub characters: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleRating {
    pub tconst: String,
    pub average_rating: f64,
    pub num_votes: i64,
}

#[cfg(test)]
mod tests {
    use super::{NameBasics, TitleEpisode, TitleRating};
    use crate::catalog::schema_for;
    use crate::core::decode::decode_line;
    use crate::core::error::ErrorKind;

    #[test]
    fn rating_row_from_record() {
        let schema = schema_for("title.ratings").expect("schema");
        let record = decode_line(&schema, "tt0000001\t5.7\t1966").expect("decode");
        let row: TitleRating = record.deserialize().expect("row");
        assert_eq!(
            row,
            TitleRating {
                tconst: "tt0000001".to_string(),
                average_rating: 5.7,
                num_votes: 1966,
            }
        );
    }

    #[test]
    fn missing_values_become_none() {
        let schema = schema_for("title.episode").expect("schema");
        let record = decode_line(&schema, "tt0041951\ttt0041038\t\\N\t\\N").expect("decode");
        let row: TitleEpisode = record.deserialize().expect("row");
        assert_eq!(row.season_number, None);
        assert_eq!(row.episode_number, None);
    }

    #[test]
    fn name_row_keeps_lists() {
        let schema = schema_for("name.basics").expect("schema");
        let line = "nm0000001\tFred Astaire\t1899\t1987\tsoundtrack,actor\ttt0050419,tt0053137";
        let row: NameBasics = decode_line(&schema, line)
            .expect("decode")
            .deserialize()
            .expect("row");
        assert_eq!(row.birth_year, Some(1899));
        assert_eq!(row.primary_profession, ["soundtrack", "actor"]);
        assert_eq!(row.known_for_titles.len(), 2);
    }

    #[test]
    fn wrong_row_type_is_a_decode_error() {
        let schema = schema_for("title.crew").expect("schema");
        let record = decode_line(&schema, "tt0000002\tnm0721526\t\\N").expect("decode");
        let err = record.deserialize::<TitleRating>().expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
