//! Scoring and aggregation engine for the Boyko emotional-burnout
//! inventory: 84 yes/no statements grouped into 3 phases and 12
//! symptoms. Pure computation: persistence and presentation live with
//! the callers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed size of the inventory.
pub const QUESTION_COUNT: u32 = 84;

/// Master representation of the 84 statements.
pub static QUESTIONS: Lazy<Inventory> = Lazy::new(|| {
    serde_json::from_str(include_str!("../resources/boyko84.json"))
        .expect("embedded boyko84.json is well formed")
});

/// Symptom tables validated against [`QUESTIONS`] at first use.
pub static TABLES: Lazy<ScoringTables> = Lazy::new(|| {
    ScoringTables::new(SYMPTOM_QUESTIONS, PHASE_SYMPTOMS, QUESTIONS.questions())
        .expect("built-in symptom tables match the embedded catalog")
});

/// The three burnout phases, always reported in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Tension,
    Resistance,
    Exhaustion,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Tension, Phase::Resistance, Phase::Exhaustion];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Tension => "tension",
            Phase::Resistance => "resistance",
            Phase::Exhaustion => "exhaustion",
        }
    }

    /// Classify a phase total against the published absolute thresholds.
    pub fn level_for(self, total: u32) -> Formation {
        let (formed, forming) = match self {
            Phase::Tension => (30, 18),
            Phase::Resistance => (25, 15),
            Phase::Exhaustion => (15, 9),
        };
        if total >= formed {
            Formation::Formed
        } else if total >= forming {
            Formation::Forming
        } else {
            Formation::NotFormed
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-tier classification applied to symptoms and phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    NotFormed,
    Forming,
    Formed,
}

impl Formation {
    pub fn name(self) -> &'static str {
        match self {
            Formation::NotFormed => "not_formed",
            Formation::Forming => "forming",
            Formation::Formed => "formed",
        }
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Four-tier classification of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnoutLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl BurnoutLevel {
    pub fn from_overall_score(score: u32) -> Self {
        if score >= 60 {
            BurnoutLevel::Critical
        } else if score >= 40 {
            BurnoutLevel::High
        } else if score >= 20 {
            BurnoutLevel::Medium
        } else {
            BurnoutLevel::Low
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BurnoutLevel::Low => "low",
            BurnoutLevel::Medium => "medium",
            BurnoutLevel::High => "high",
            BurnoutLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for BurnoutLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One inventory statement. `reverse` means a "no" answer scores the
/// point instead of "yes".
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub phase: Phase,
    pub symptom: String,
    #[serde(default)]
    pub reverse: bool,
}

/// The deserialized question catalog.
#[derive(Debug, Deserialize)]
pub struct Inventory {
    questions: Vec<Question>,
}

impl Inventory {
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Look a statement up by its 1-based id.
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Question ids owned by each symptom, in scoring order. Symptom `k`
/// owns every twelfth statement starting at `k`.
pub const SYMPTOM_QUESTIONS: &[(&str, &[u32])] = &[
    ("traumatic_circumstances", &[1, 13, 25, 37, 49, 61, 73]),
    ("self_dissatisfaction", &[2, 14, 26, 38, 50, 62, 74]),
    ("trapped_in_cage", &[3, 15, 27, 39, 51, 63, 75]),
    ("anxiety_and_depression", &[4, 16, 28, 40, 52, 64, 76]),
    ("inadequate_emotional_response", &[5, 17, 29, 41, 53, 65, 77]),
    ("emotional_moral_disorientation", &[6, 18, 30, 42, 54, 66, 78]),
    ("emotion_economy_expansion", &[7, 19, 31, 43, 55, 67, 79]),
    ("professional_duty_reduction", &[8, 20, 32, 44, 56, 68, 80]),
    ("emotional_deficit", &[9, 21, 33, 45, 57, 69, 81]),
    ("emotional_detachment", &[10, 22, 34, 46, 58, 70, 82]),
    ("depersonalization", &[11, 23, 35, 47, 59, 71, 83]),
    ("psychosomatic_disorders", &[12, 24, 36, 48, 60, 72, 84]),
];

/// Symptoms owned by each phase, phases in reporting order.
pub const PHASE_SYMPTOMS: &[(Phase, &[&str])] = &[
    (
        Phase::Tension,
        &[
            "traumatic_circumstances",
            "self_dissatisfaction",
            "trapped_in_cage",
            "anxiety_and_depression",
        ],
    ),
    (
        Phase::Resistance,
        &[
            "inadequate_emotional_response",
            "emotional_moral_disorientation",
            "emotion_economy_expansion",
            "professional_duty_reduction",
        ],
    ),
    (
        Phase::Exhaustion,
        &[
            "emotional_deficit",
            "emotional_detachment",
            "depersonalization",
            "psychosomatic_disorders",
        ],
    ),
];

/// Collected yes/no answers, keyed by question id. Incomplete sheets
/// are legal; unanswered statements simply score nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    values: BTreeMap<u32, bool>,
    offset: u32,
}

impl AnswerSheet {
    /// Store the answer to the next statement in catalog order.
    pub fn push(&mut self, answer: bool) -> Result<(), Error> {
        if self.offset >= QUESTION_COUNT {
            return Err(Error::IllegalQuestion);
        }
        self.offset += 1;
        self.values.insert(self.offset, answer);
        Ok(())
    }

    /// Store an answer by question id.
    pub fn insert(&mut self, question_no: u32, answer: bool) -> Result<(), Error> {
        if !(1..=QUESTION_COUNT).contains(&question_no) {
            return Err(Error::IllegalQuestion);
        }
        self.values.insert(question_no, answer);
        Ok(())
    }

    pub fn answer(&self, id: u32) -> Option<bool> {
        self.values.get(&id).copied()
    }

    pub fn answered(&self) -> usize {
        self.values.len()
    }

    pub fn is_complete(&self) -> bool {
        self.values.len() == QUESTION_COUNT as usize
    }
}

/// Score and level of a single symptom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomResult {
    pub score: u32,
    pub level: Formation,
    pub max_score: u32,
}

/// Totals for one phase with its four symptom breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub total: u32,
    pub symptoms: BTreeMap<String, SymptomResult>,
    pub level: Formation,
    pub max_score: u32,
}

/// Complete scored inventory, the unit handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutResult {
    pub tension: PhaseResult,
    pub resistance: PhaseResult,
    pub exhaustion: PhaseResult,
    pub overall_score: u32,
    pub burnout_level: BurnoutLevel,
}

impl BurnoutResult {
    pub fn phase(&self, phase: Phase) -> &PhaseResult {
        match phase {
            Phase::Tension => &self.tension,
            Phase::Resistance => &self.resistance,
            Phase::Exhaustion => &self.exhaustion,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseResult {
        match phase {
            Phase::Tension => &mut self.tension,
            Phase::Resistance => &mut self.resistance,
            Phase::Exhaustion => &mut self.exhaustion,
        }
    }

    /// Project the result onto the persisted record shape.
    pub fn to_stored(&self, session_duration: Option<u32>) -> StoredResult {
        StoredResult {
            tension_score: self.tension.total,
            resistance_score: self.resistance.total,
            exhaustion_score: self.exhaustion.total,
            overall_score: self.overall_score,
            burnout_level: self.burnout_level,
            session_duration,
        }
    }
}

/// A configuration defect in the symptom tables or catalog. Any of
/// these would silently under- or over-count at scoring time, so table
/// construction rejects them outright.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("catalog lists question {id} more than once")]
    DuplicateCatalogEntry { id: u32 },
    #[error("question {id} is claimed by both '{first}' and '{second}'")]
    QuestionClaimedTwice { id: u32, first: String, second: String },
    #[error("symptom '{symptom}' references question {id} which is not in the catalog")]
    QuestionMissing { symptom: String, id: u32 },
    #[error("catalog question {id} is not covered by any symptom")]
    UncoveredQuestion { id: u32 },
    #[error("symptom '{symptom}' is not assigned to any phase")]
    UnassignedSymptom { symptom: String },
    #[error("symptom '{symptom}' is listed under more than one phase")]
    SymptomInTwoPhases { symptom: String },
    #[error("phase table names '{symptom}' but no question list defines it")]
    MissingQuestionList { symptom: String },
    #[error("symptom '{symptom}' has an empty question list")]
    EmptySymptom { symptom: String },
    #[error("catalog question {id} carries tags that disagree with the symptom tables")]
    TagMismatch { id: u32 },
}

#[derive(Debug, Clone)]
struct SymptomEntry {
    name: String,
    phase: Phase,
    question_ids: Vec<u32>,
    max_score: u32,
}

/// Validated mapping tables driving the scoring engine. Built once from
/// the literal tables above, or from substitute tables in tests.
#[derive(Debug, Clone)]
pub struct ScoringTables {
    symptoms: Vec<SymptomEntry>,
}

impl ScoringTables {
    /// Cross-check the tables against the catalog and precompute the
    /// symptom → phase resolution. Every question id must be claimed by
    /// exactly one symptom and every symptom must sit in exactly one
    /// phase.
    pub fn new(
        symptom_questions: &[(&str, &[u32])],
        phase_symptoms: &[(Phase, &[&str])],
        catalog: &[Question],
    ) -> Result<Self, ConfigError> {
        let mut phase_of: BTreeMap<&str, Phase> = BTreeMap::new();
        for (phase, symptoms) in phase_symptoms {
            for name in *symptoms {
                if phase_of.insert(*name, *phase).is_some() {
                    return Err(ConfigError::SymptomInTwoPhases {
                        symptom: (*name).to_string(),
                    });
                }
            }
        }

        let mut by_id: HashMap<u32, &Question> = HashMap::with_capacity(catalog.len());
        for question in catalog {
            if by_id.insert(question.id, question).is_some() {
                return Err(ConfigError::DuplicateCatalogEntry { id: question.id });
            }
        }

        let mut claimed: BTreeMap<u32, &str> = BTreeMap::new();
        let mut symptoms = Vec::with_capacity(symptom_questions.len());
        for (name, ids) in symptom_questions {
            let phase = phase_of
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnassignedSymptom {
                    symptom: (*name).to_string(),
                })?;
            if ids.is_empty() {
                return Err(ConfigError::EmptySymptom {
                    symptom: (*name).to_string(),
                });
            }
            for &id in *ids {
                if let Some(first) = claimed.insert(id, *name) {
                    return Err(ConfigError::QuestionClaimedTwice {
                        id,
                        first: first.to_string(),
                        second: (*name).to_string(),
                    });
                }
                let question = by_id.get(&id).ok_or_else(|| ConfigError::QuestionMissing {
                    symptom: (*name).to_string(),
                    id,
                })?;
                if question.symptom != *name || question.phase != phase {
                    return Err(ConfigError::TagMismatch { id });
                }
            }
            symptoms.push(SymptomEntry {
                name: (*name).to_string(),
                phase,
                question_ids: ids.to_vec(),
                max_score: ids.len() as u32,
            });
        }

        for name in phase_of.keys() {
            if !symptom_questions.iter().any(|(n, _)| n == name) {
                return Err(ConfigError::MissingQuestionList {
                    symptom: (*name).to_string(),
                });
            }
        }
        for question in catalog {
            if !claimed.contains_key(&question.id) {
                return Err(ConfigError::UncoveredQuestion { id: question.id });
            }
        }

        Ok(Self { symptoms })
    }

    /// Highest score a phase can reach, summed over its symptoms.
    pub fn phase_max_score(&self, phase: Phase) -> u32 {
        self.symptoms
            .iter()
            .filter(|entry| entry.phase == phase)
            .map(|entry| entry.max_score)
            .sum()
    }

    /// Score an answer sheet.
    ///
    /// Each answered statement contributes one point to its symptom
    /// when the answer matches the key: "yes" on direct items, "no" on
    /// reverse-coded ones. Unanswered statements and ids absent from
    /// the catalog contribute nothing, so a partially completed sheet
    /// scores without error.
    ///
    /// Symptom levels come from the share of the symptom maximum (85%
    /// formed, 50% forming), phase levels from absolute thresholds:
    ///
    /// | phase      | forming | formed |
    /// |------------|---------|--------|
    /// | tension    | 18      | 30     |
    /// | resistance | 15      | 25     |
    /// | exhaustion | 9       | 15     |
    ///
    /// The overall score is the sum of the three phase totals
    /// (0..=84): 60 and above critical, 40 high, 20 medium, below 20
    /// low.
    pub fn score(&self, answers: &AnswerSheet, catalog: &[Question]) -> BurnoutResult {
        let by_id: HashMap<u32, &Question> = catalog
            .iter()
            .map(|question| (question.id, question))
            .collect();

        let mut result = BurnoutResult {
            tension: self.empty_phase(Phase::Tension),
            resistance: self.empty_phase(Phase::Resistance),
            exhaustion: self.empty_phase(Phase::Exhaustion),
            overall_score: 0,
            burnout_level: BurnoutLevel::Low,
        };

        for entry in &self.symptoms {
            let mut score = 0;
            for &id in &entry.question_ids {
                let Some(question) = by_id.get(&id) else {
                    continue;
                };
                let Some(answer) = answers.answer(id) else {
                    continue;
                };
                if answer != question.reverse {
                    score += 1;
                }
            }
            let phase = result.phase_mut(entry.phase);
            phase.symptoms.insert(
                entry.name.clone(),
                SymptomResult {
                    score,
                    level: symptom_level(score, entry.max_score),
                    max_score: entry.max_score,
                },
            );
            phase.total += score;
        }

        for phase in Phase::ALL {
            let phase_result = result.phase_mut(phase);
            phase_result.level = phase.level_for(phase_result.total);
        }
        result.overall_score =
            result.tension.total + result.resistance.total + result.exhaustion.total;
        result.burnout_level = BurnoutLevel::from_overall_score(result.overall_score);
        result
    }

    fn empty_phase(&self, phase: Phase) -> PhaseResult {
        PhaseResult {
            total: 0,
            symptoms: BTreeMap::new(),
            level: Formation::NotFormed,
            max_score: self.phase_max_score(phase),
        }
    }
}

/// Percentage classification without floats: `score / max >= 85%` is
/// formed, `>= 50%` forming.
fn symptom_level(score: u32, max_score: u32) -> Formation {
    if score * 100 >= max_score * 85 {
        Formation::Formed
    } else if score * 100 >= max_score * 50 {
        Formation::Forming
    } else {
        Formation::NotFormed
    }
}

/// Shuffle the catalog into a presentation order. Scoring never
/// depends on order; this exists for the question flow only.
pub fn randomized_questions(catalog: &[Question]) -> Vec<Question> {
    randomized_questions_with(catalog, &mut rand::thread_rng())
}

/// Shuffle with a caller-supplied generator, for reproducible orders.
pub fn randomized_questions_with<R: Rng + ?Sized>(
    catalog: &[Question],
    rng: &mut R,
) -> Vec<Question> {
    let mut shuffled = catalog.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// The persisted record shape the aggregation functions consume. Field
/// names follow the storage schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub tension_score: u32,
    pub resistance_score: u32,
    pub exhaustion_score: u32,
    pub overall_score: u32,
    pub burnout_level: BurnoutLevel,
    #[serde(default)]
    pub session_duration: Option<u32>,
}

/// Respondent counts per overall burnout level. All four buckets are
/// always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelDistribution {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl LevelDistribution {
    fn count(&mut self, level: BurnoutLevel) {
        match level {
            BurnoutLevel::Low => self.low += 1,
            BurnoutLevel::Medium => self.medium += 1,
            BurnoutLevel::High => self.high += 1,
            BurnoutLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high + self.critical
    }
}

/// Batch statistics over a snapshot of stored results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_tests: u32,
    pub avg_overall_score: f64,
    pub avg_tension_score: f64,
    pub avg_resistance_score: f64,
    pub avg_exhaustion_score: f64,
    pub distribution: LevelDistribution,
}

/// Summarize a snapshot. An empty snapshot yields the zero-value
/// summary rather than dividing by zero. Averages are plain float
/// division; rounding is left to presentation.
pub fn summarize(results: &[StoredResult]) -> AggregateSummary {
    if results.is_empty() {
        return AggregateSummary {
            total_tests: 0,
            avg_overall_score: 0.0,
            avg_tension_score: 0.0,
            avg_resistance_score: 0.0,
            avg_exhaustion_score: 0.0,
            distribution: LevelDistribution::default(),
        };
    }

    let count = results.len() as f64;
    let mut overall: u64 = 0;
    let mut tension: u64 = 0;
    let mut resistance: u64 = 0;
    let mut exhaustion: u64 = 0;
    for record in results {
        overall += u64::from(record.overall_score);
        tension += u64::from(record.tension_score);
        resistance += u64::from(record.resistance_score);
        exhaustion += u64::from(record.exhaustion_score);
    }

    AggregateSummary {
        total_tests: results.len() as u32,
        avg_overall_score: overall as f64 / count,
        avg_tension_score: tension as f64 / count,
        avg_resistance_score: resistance as f64 / count,
        avg_exhaustion_score: exhaustion as f64 / count,
        distribution: distribution(results),
    }
}

/// Count respondents per burnout level.
pub fn distribution(results: &[StoredResult]) -> LevelDistribution {
    let mut counts = LevelDistribution::default();
    for record in results {
        counts.count(record.burnout_level);
    }
    counts
}

/// Mean session duration in whole seconds over the records that carry
/// one. Records without a duration stay out of both the numerator and
/// the denominator; an empty set yields 0.
pub fn average_session_duration(results: &[StoredResult]) -> u32 {
    let durations: Vec<u32> = results
        .iter()
        .filter_map(|record| record.session_duration)
        .collect();
    if durations.is_empty() {
        return 0;
    }
    let sum: u64 = durations.iter().map(|&duration| u64::from(duration)).sum();
    (sum as f64 / durations.len() as f64).round() as u32
}

#[derive(Debug, Error)]
pub enum Error {
    /// Question number outside 1..=84.
    #[error("question number outside the 84-item inventory")]
    IllegalQuestion,
    /// An answer cell that is neither yes nor no.
    #[error("answer must be yes or no")]
    IllegalAnswer,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read bulk answer rows: one respondent per row, an id in the first
/// cell followed by up to 84 answer cells in catalog order. Cells hold
/// `y`/`n` (also `yes`/`no`, `1`/`0`, `true`/`false`); a blank cell is
/// an unanswered statement.
pub fn read_bulk<R: Read>(reader: R) -> impl Iterator<Item = Result<(String, AnswerSheet), Error>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_records()
        .map(|record| match record {
            Ok(record) => parse_answer_record(&record),
            Err(err) => Err(err.into()),
        })
}

fn parse_answer_record(record: &csv::StringRecord) -> Result<(String, AnswerSheet), Error> {
    let mut fields = record.iter();
    let id = fields.next().ok_or(Error::IllegalQuestion)?.to_string();
    let mut sheet = AnswerSheet::default();
    for (index, cell) in fields.enumerate() {
        if let Some(answer) = parse_answer(cell)? {
            sheet.insert(index as u32 + 1, answer)?;
        }
    }
    Ok((id, sheet))
}

fn parse_answer(cell: &str) -> Result<Option<bool>, Error> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "y" | "yes" | "1" | "true" => Ok(Some(true)),
        "n" | "no" | "0" | "false" => Ok(Some(false)),
        _ => Err(Error::IllegalAnswer),
    }
}

/// Read stored results from a headed CSV. A record with an unknown
/// burnout level fails deserialization here, before it can reach any
/// counter.
pub fn read_results<R: Read>(reader: R) -> Result<Vec<StoredResult>, Error> {
    let mut rows = Vec::new();
    for row in csv::Reader::from_reader(reader).into_deserialize::<StoredResult>() {
        rows.push(row?);
    }
    Ok(rows)
}
