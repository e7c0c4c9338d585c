//! Small fixture indices shared by the unit tests.

use std::sync::Arc;

use tempfile::TempDir;

use crate::config::SearcherConfig;
use crate::errors::{MatchError, MatchResult};
use crate::parser::{treat_word, WordType};
use crate::query::builder::BooleanQuery;
use crate::query::executor::SearchContext;
use crate::searcher::NameSearcher;
use crate::store::index::{Document, IndexKind, SearchIndex, TopDocs};
use crate::store::schema::field;
use crate::store::writer::IndexWriter;

pub(crate) struct Fixture {
    pub dir: TempDir,
    pub searcher: NameSearcher,
}

struct Taxon<'a> {
    id: &'a str,
    lsid: &'a str,
    name: &'a str,
    rank: &'a str,
    rank_id: &'a str,
    higher: &'a [(&'a str, &'a str)],
}

impl Taxon<'_> {
    fn document(&self) -> Document {
        let mut doc = Document::new()
            .with(field::ID, self.id)
            .with(field::LSID, self.lsid)
            .with(field::NAME, self.name)
            .with(field::RANK, self.rank)
            .with(field::RANK_ID, self.rank_id);
        for (f, v) in self.higher {
            doc.add(f, v);
        }
        doc
    }
}

const KANGAROOS: &[(&str, &str)] = &[
    (field::KINGDOM, "Animalia"),
    (field::PHYLUM, "Chordata"),
    (field::CLASS, "Mammalia"),
    (field::ORDER, "Diprotodontia"),
    (field::FAMILY, "Macropodidae"),
    (field::GENUS, "Macropus"),
];

fn species(id: &str, lsid: &str, epithet: &str) -> Document {
    let name = format!("Macropus {epithet}");
    Taxon {
        id,
        lsid,
        name: &name,
        rank: "species",
        rank_id: "7000",
        higher: KANGAROOS,
    }
    .document()
    .with(field::SPECIES, &name)
    .with(field::SPECIFIC, epithet)
    .with(field::GENUS_EX, &treat_word("Macropus", WordType::Genus))
    .with(field::SPECIES_EX, &treat_word(epithet, WordType::Species))
    .with(field::INFRA_EX, field::NO_INFRA_SENTINEL)
    .with(field::KINGDOM_ID, "10")
    .with(field::PHYLUM_ID, "999")
    .with(field::GENUS_ID, "3")
}

fn genus(id: &str, lsid: &str, name: &str, higher: &[(&str, &str)]) -> Document {
    Taxon {
        id,
        lsid,
        name,
        rank: "genus",
        rank_id: "6000",
        higher,
    }
    .document()
    .with(field::GENUS, name)
}

fn agathis_robusta(id: &str, lsid: &str, higher: &[(&str, &str)]) -> Document {
    Taxon {
        id,
        lsid,
        name: "Agathis robusta",
        rank: "species",
        rank_id: "7000",
        higher,
    }
    .document()
    .with(field::GENUS, "Agathis")
    .with(field::SPECIES, "Agathis robusta")
    .with(field::SPECIFIC, "robusta")
}

fn reference_species(species: &str, higher: &[(&str, &str)]) -> Document {
    let genus = species.split_whitespace().next().unwrap_or(species);
    let mut doc = Document::new()
        .with(field::RANK, "species")
        .with(field::GENUS, genus)
        .with(field::SPECIES, species);
    for (f, v) in higher {
        doc.add(f, v);
    }
    doc
}

const PINES: &[(&str, &str)] = &[(field::KINGDOM, "Plantae"), (field::PHYLUM, "Pinophyta")];
const WASPS: &[(&str, &str)] = &[(field::KINGDOM, "Animalia"), (field::PHYLUM, "Arthropoda")];

fn reference(genus: &str, higher: &[(&str, &str)]) -> Document {
    let mut doc = Document::new()
        .with(field::RANK, "genus")
        .with(field::GENUS, genus);
    for (f, v) in higher {
        doc.add(f, v);
    }
    doc
}

impl Fixture {
    pub const RUFUS: &'static str = "urn:lsid:example:macropus-rufus";
    pub const GIGANTEUS: &'static str = "urn:lsid:example:macropus-giganteus";
    pub const MACROPUS: &'static str = "urn:lsid:example:macropus";
    pub const ANIMALIA: &'static str = "urn:lsid:example:animalia";
    pub const RUFA: &'static str = "urn:lsid:example:macropus-rufa";
    pub const OLD_RUFUS: &'static str = "urn:lsid:legacy:1234";
    pub const ASTROLOMA: &'static str = "urn:lsid:example:astroloma-cataby";
    pub const GREVILLEA_CV: &'static str = "urn:lsid:example:grevillea-robyn-gordon";
    pub const AGATHIS_PLANT: &'static str = "urn:lsid:example:agathis-plant";
    pub const AGATHIS_WASP: &'static str = "urn:lsid:example:agathis-wasp";
    pub const ROBUSTA_PLANT: &'static str = "urn:lsid:example:agathis-robusta-plant";
    pub const ROBUSTA_WASP: &'static str = "urn:lsid:example:agathis-robusta-wasp";

    fn primary_docs() -> Vec<Document> {
        vec![
            species("1", Self::RUFUS, "rufus"),
            species("2", Self::GIGANTEUS, "giganteus"),
            genus(
                "3",
                Self::MACROPUS,
                "Macropus",
                &[(field::KINGDOM, "Animalia"), (field::FAMILY, "Macropodidae")],
            ),
            Document::new()
                .with(field::ID, "4")
                .with(field::LSID, Self::RUFA)
                .with(field::ACCEPTED_LSID, Self::RUFUS)
                .with(field::IS_SYNONYM, field::TRUE)
                .with(field::NAME, "Macropus rufa")
                .with(field::RANK_ID, "7000"),
            Taxon {
                id: "10",
                lsid: Self::ANIMALIA,
                name: "Animalia",
                rank: "kingdom",
                rank_id: "1000",
                higher: &[(field::KINGDOM, "Animalia")],
            }
            .document(),
            Taxon {
                id: "11",
                lsid: "urn:lsid:example:macropodidae",
                name: "Macropodidae",
                rank: "family",
                rank_id: "5000",
                higher: &[(field::KINGDOM, "Animalia"), (field::FAMILY, "Macropodidae")],
            }
            .document(),
            genus(
                "20",
                Self::AGATHIS_PLANT,
                "Agathis",
                &[
                    (field::KINGDOM, "Plantae"),
                    (field::PHYLUM, "Pinophyta"),
                    (field::FAMILY, "Araucariaceae"),
                ],
            ),
            genus(
                "21",
                Self::AGATHIS_WASP,
                "Agathis",
                &[
                    (field::KINGDOM, "Animalia"),
                    (field::PHYLUM, "Arthropoda"),
                    (field::FAMILY, "Braconidae"),
                ],
            ),
            agathis_robusta("22", Self::ROBUSTA_PLANT, PINES),
            agathis_robusta("23", Self::ROBUSTA_WASP, WASPS),
            Taxon {
                id: "30",
                lsid: "urn:lsid:example:bacteria-kingdom",
                name: "Bacteria",
                rank: "kingdom",
                rank_id: "1000",
                higher: &[(field::KINGDOM, "Bacteria")],
            }
            .document(),
            genus(
                "31",
                "urn:lsid:example:bacteria-genus",
                "Bacteria",
                &[(field::KINGDOM, "Animalia")],
            ),
            Taxon {
                id: "40",
                lsid: Self::ASTROLOMA,
                name: "Astroloma sp. Cataby (E.A.Griffin 1022)",
                rank: "species",
                rank_id: "7000",
                higher: &[(field::KINGDOM, "Plantae"), (field::GENUS, "Astroloma")],
            }
            .document()
            .with(field::PHRASE, "Cataby")
            .with(field::VOUCHER, "EAGriffin1022"),
            Taxon {
                id: "41",
                lsid: Self::GREVILLEA_CV,
                name: "Grevillea 'Robyn Gordon'",
                rank: "cultivar",
                rank_id: "8050",
                higher: &[(field::KINGDOM, "Plantae"), (field::GENUS, "Grevillea")],
            }
            .document()
            .with(field::PHRASE, "Robyn Gordon"),
        ]
    }

    fn reference_docs() -> Vec<Document> {
        vec![
            reference("Agathis", PINES),
            reference("Agathis", WASPS),
            reference_species("Agathis robusta", PINES),
            reference_species("Agathis robusta", WASPS),
            reference("Macropus", &[(field::KINGDOM, "Animalia")]),
            reference("Bacteria", &[(field::KINGDOM, "Animalia")]),
        ]
    }

    fn vernacular_docs() -> Vec<Document> {
        ["Macropus giganteus", "Macropus giganteus Shaw, 1790"]
            .iter()
            .map(|name| {
                Document::new()
                    .with(field::COMMON_NAME, "REDKANGAROO")
                    .with(field::NAME, name)
                    .with(field::LSID, Self::GIGANTEUS)
            })
            .collect()
    }

    fn identifier_docs() -> Vec<Document> {
        vec![Document::new()
            .with(field::LSID, Self::OLD_RUFUS)
            .with(field::REAL_LSID, Self::RUFUS)]
    }

    pub fn standard() -> Self {
        Self::with_extra(&[])
    }

    /// Standard indices plus `extra` documents appended to the given index.
    pub fn with_extra(extra: &[(IndexKind, Document)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for kind in IndexKind::ALL {
            let docs = match kind {
                IndexKind::Primary => Self::primary_docs(),
                IndexKind::Reference => Self::reference_docs(),
                IndexKind::Vernacular => Self::vernacular_docs(),
                IndexKind::Identifier => Self::identifier_docs(),
            };
            let mut writer = IndexWriter::create(&kind.path_in(dir.path())).unwrap();
            for doc in docs.iter().chain(extra.iter().filter(|(k, _)| *k == kind).map(|(_, d)| d)) {
                writer.add_document(doc).unwrap();
            }
            writer.commit().unwrap();
        }
        let searcher = NameSearcher::open(SearcherConfig::new(dir.path()).with_pool_size(2)).unwrap();
        Self { dir, searcher }
    }

    pub fn context(&self) -> SearchContext<'_> {
        self.searcher.context()
    }

    /// Context whose primary index fails every call.
    pub fn failing_context(&self) -> SearchContext<'_> {
        SearchContext {
            primary: Arc::new(FailingIndex),
            ..self.context()
        }
    }
}

struct FailingIndex;

impl SearchIndex for FailingIndex {
    fn label(&self) -> &str {
        "failing"
    }

    fn search(&self, _query: &BooleanQuery, _max: usize) -> MatchResult<TopDocs> {
        Err(MatchError::unavailable("failing", "disk on fire"))
    }

    fn fetch(&self, _doc_id: i64) -> MatchResult<Document> {
        Err(MatchError::unavailable("failing", "disk on fire"))
    }
}
