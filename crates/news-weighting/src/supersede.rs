use analysis_core::{text::normalize_text, NewsItem, TopicClaim, TopicClassifier, TopicDirection};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;

use crate::recency::parse_published_date;

/// Named actor inside a topic, e.g. the Fed for policy-rate headlines.
#[derive(Debug, Clone)]
pub struct EntityRule {
    pub name: String,
    pub markers: Vec<String>,
}

/// Keyword rule for one supersedable topic.
///
/// A title belongs to the topic when any `markers` keyword appears; its direction
/// comes from the `up`/`down` sets, and a title matching both is left unclassified.
#[derive(Debug, Clone)]
pub struct TopicRule {
    pub topic: String,
    pub markers: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    /// Checked in order; the first match names the entity.
    pub entities: Vec<EntityRule>,
    pub default_entity: String,
}

/// Keyword set of one rule. Non-ASCII keywords (Chinese) match as substrings;
/// ASCII keywords only at the start of a word, so `ease` never fires inside
/// `increase` while `hike` still covers `hikes`.
#[derive(Debug, Clone)]
struct KeywordMatcher {
    substrings: Vec<String>,
    word_starts: Option<Regex>,
}

impl KeywordMatcher {
    fn new(keywords: &[String]) -> Self {
        let (ascii, mut substrings): (Vec<String>, Vec<String>) = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .partition(|k| k.is_ascii());
        if ascii.is_empty() {
            return Self { substrings, word_starts: None };
        }

        let alternation = ascii.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|");
        let word_starts = match Regex::new(&format!(r"\b(?:{})", alternation)) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("keyword pattern rejected, matching as substrings: {}", e);
                substrings.extend(ascii);
                None
            }
        };
        Self { substrings, word_starts }
    }

    fn is_match(&self, text: &str) -> bool {
        self.substrings.iter().any(|k| text.contains(k.as_str()))
            || self.word_starts.as_ref().is_some_and(|re| re.is_match(text))
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    topic: String,
    markers: KeywordMatcher,
    up: KeywordMatcher,
    down: KeywordMatcher,
    entities: Vec<(String, KeywordMatcher)>,
    default_entity: String,
}

impl CompiledRule {
    fn new(rule: &TopicRule) -> Self {
        Self {
            topic: rule.topic.clone(),
            markers: KeywordMatcher::new(&rule.markers),
            up: KeywordMatcher::new(&rule.up),
            down: KeywordMatcher::new(&rule.down),
            entities: rule
                .entities
                .iter()
                .map(|e| (e.name.clone(), KeywordMatcher::new(&e.markers)))
                .collect(),
            default_entity: rule.default_entity.clone(),
        }
    }

    fn classify(&self, text: &str) -> Option<TopicClaim> {
        if !self.markers.is_match(text) {
            return None;
        }
        let direction = match (self.up.is_match(text), self.down.is_match(text)) {
            (true, false) => TopicDirection::Up,
            (false, true) => TopicDirection::Down,
            _ => return None,
        };
        let entity = self
            .entities
            .iter()
            .find(|(_, markers)| markers.is_match(text))
            .map(|(name, _)| name.as_str())
            .unwrap_or(&self.default_entity);
        Some(TopicClaim {
            topic: format!("{}:{}", entity, self.topic),
            direction,
        })
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Data-driven topic classifier; rules are tried in order.
#[derive(Debug, Clone)]
pub struct KeywordTopicClassifier {
    rules: Vec<CompiledRule>,
}

impl KeywordTopicClassifier {
    pub fn new(rules: Vec<TopicRule>) -> Self {
        Self {
            rules: rules.iter().map(CompiledRule::new).collect(),
        }
    }

    /// Central-bank policy rates and tariff actions, in Chinese and English.
    pub fn policy() -> Self {
        let policy_rate = TopicRule {
            topic: "policy_rate".to_string(),
            // Many CN headlines only say 加息/降息 without 利率
            markers: words(&["利率", "rate", "加息", "降息", "升息"]),
            up: words(&["加息", "升息", "上调", "提高", "raise", "hike", "increase", "tighten"]),
            down: words(&["降息", "下调", "降低", "cut", "lower", "ease", "easing"]),
            entities: vec![
                EntityRule {
                    name: "fed".to_string(),
                    markers: words(&["美联储", "fed", "fomc"]),
                },
                EntityRule {
                    name: "ecb".to_string(),
                    markers: words(&["欧洲央行", "ecb"]),
                },
                EntityRule {
                    name: "pboc".to_string(),
                    markers: words(&["人民银行", "央行", "pboc"]),
                },
            ],
            default_entity: "rate".to_string(),
        };

        let tariff = TopicRule {
            topic: "tariff".to_string(),
            markers: words(&["关税", "tariff"]),
            up: words(&["加征", "上调", "提高", "raise", "impose", "increase"]),
            down: words(&["取消", "下调", "降低", "reduce", "cut", "suspend", "roll back"]),
            entities: vec![],
            default_entity: "global".to_string(),
        };

        Self::new(vec![policy_rate, tariff])
    }
}

impl Default for KeywordTopicClassifier {
    fn default() -> Self {
        Self::policy()
    }
}

impl TopicClassifier for KeywordTopicClassifier {
    fn classify(&self, title: &str) -> Option<TopicClaim> {
        let text = normalize_text(title);
        if text.is_empty() {
            return None;
        }
        self.rules.iter().find_map(|rule| rule.classify(&text))
    }
}

fn dated_claim(classifier: &dyn TopicClassifier, item: &NewsItem) -> Option<(TopicClaim, NaiveDate)> {
    let claim = classifier.classify(&item.title)?;
    let published = parse_published_date(&item.published_at)?;
    Some((claim, published))
}

/// Zero the weight of every record contradicted by a newer record on the same topic.
///
/// Per topic the record with the latest publish date wins (first seen on ties).
/// Strictly older records with the opposite direction get `weight = 0` and
/// `superseded = true`; records without a parseable date are never touched.
/// Returns the number of records superseded.
pub fn apply_supersession(items: &mut [NewsItem], classifier: &dyn TopicClassifier) -> usize {
    let claims: Vec<Option<(TopicClaim, NaiveDate)>> =
        items.iter().map(|it| dated_claim(classifier, it)).collect();

    let mut latest: HashMap<&str, (NaiveDate, TopicDirection)> = HashMap::new();
    for (claim, published) in claims.iter().flatten() {
        let newer = latest
            .get(claim.topic.as_str())
            .map_or(true, |(prev, _)| published > prev);
        if newer {
            latest.insert(claim.topic.as_str(), (*published, claim.direction));
        }
    }

    let mut superseded = 0;
    for (item, claim) in items.iter_mut().zip(&claims) {
        let Some((claim, published)) = claim else {
            continue;
        };
        let Some((latest_date, latest_direction)) = latest.get(claim.topic.as_str()) else {
            continue;
        };
        if published < latest_date && claim.direction != *latest_direction {
            tracing::debug!(
                "superseded '{}' ({}) by newer {} claim from {}",
                item.title,
                item.published_at,
                claim.topic,
                latest_date
            );
            item.weight = 0.0;
            item.superseded = true;
            superseded += 1;
        }
    }
    superseded
}
