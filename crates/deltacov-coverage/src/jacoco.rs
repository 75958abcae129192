//! JaCoCo XML reports with per-line detail.
//!
//! A `<package>` lists its `<class>` elements (methods and class counters)
//! followed by `<sourcefile>` elements (per-line counters). Classes are held
//! until their package closes so that both halves can be joined.

use std::collections::{BTreeMap, BTreeSet};

use deltacov_types::{Counter, CoverageCounters, CoverageEntity};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::model::{
    ClassDetail, LineCounters, MethodCoverage, RawCoverageData, RawCoverageDataProvider,
};
use crate::CoverageParseError;

/// Reads class counters and per-line detail from a JaCoCo XML report.
#[derive(Debug, Clone, Copy)]
pub struct JacocoXmlProvider<'a> {
    bytes: &'a [u8],
}

impl<'a> JacocoXmlProvider<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl RawCoverageDataProvider for JacocoXmlProvider<'_> {
    fn obtain_data(&self) -> Result<Vec<RawCoverageData>, CoverageParseError> {
        let text = std::str::from_utf8(self.bytes).map_err(|_| CoverageParseError::InvalidUtf8)?;
        parse_jacoco_xml(text)
    }
}

fn parse_jacoco_xml(text: &str) -> Result<Vec<RawCoverageData>, CoverageParseError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut state = ReportState::default();
    let mut saw_report = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                saw_report |= e.name().as_ref() == b"report";
                state.open(e)?;
            }
            Ok(Event::Empty(ref e)) => {
                saw_report |= e.name().as_ref() == b"report";
                state.open(e)?;
                state.close(e.name().as_ref());
            }
            Ok(Event::End(ref e)) => state.close(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(CoverageParseError::Xml {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                });
            }
        }
        buf.clear();
    }

    if !saw_report {
        return Err(CoverageParseError::MalformedXml(
            "no <report> element found".to_string(),
        ));
    }
    Ok(state.out)
}

#[derive(Debug)]
struct PendingMethod {
    name: String,
    descriptor: String,
    first_line: Option<u32>,
    complexity: Counter,
    method: Counter,
}

#[derive(Debug)]
struct PendingClass {
    class_name: String,
    source_file: Option<String>,
    counters: CoverageCounters,
    methods: Vec<PendingMethod>,
}

#[derive(Debug, Default)]
struct PendingPackage {
    group: String,
    classes: Vec<PendingClass>,
    sourcefiles: BTreeMap<String, BTreeMap<u32, LineCounters>>,
}

#[derive(Debug, Default)]
struct ReportState {
    report_name: String,
    groups: Vec<String>,
    package: Option<PendingPackage>,
    class: Option<PendingClass>,
    method: Option<PendingMethod>,
    sourcefile: Option<(String, BTreeMap<u32, LineCounters>)>,
    out: Vec<RawCoverageData>,
}

impl ReportState {
    fn group_name(&self) -> String {
        if self.groups.is_empty() {
            self.report_name.clone()
        } else {
            self.groups.join("/")
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), CoverageParseError> {
        match e.name().as_ref() {
            b"report" => self.report_name = attr(e, b"name")?.unwrap_or_default(),
            b"group" => self.groups.push(required_attr(e, b"name")?),
            b"package" => {
                self.package = Some(PendingPackage {
                    group: self.group_name(),
                    ..PendingPackage::default()
                });
            }
            b"class" => {
                self.class = Some(PendingClass {
                    class_name: required_attr(e, b"name")?.replace('/', "."),
                    source_file: attr(e, b"sourcefilename")?,
                    counters: CoverageCounters::default(),
                    methods: Vec::new(),
                });
            }
            b"method" => {
                let first_line = match attr(e, b"line")? {
                    Some(v) => Some(parse_number(e, b"line", &v)?),
                    None => None,
                };
                self.method = Some(PendingMethod {
                    name: required_attr(e, b"name")?,
                    descriptor: attr(e, b"desc")?.unwrap_or_default(),
                    first_line,
                    complexity: Counter::ZERO,
                    method: Counter::ZERO,
                });
            }
            b"counter" => self.record_counter(e)?,
            b"sourcefile" => {
                self.sourcefile = Some((required_attr(e, b"name")?, BTreeMap::new()));
            }
            b"line" => {
                if let Some((_, lines)) = self.sourcefile.as_mut() {
                    let nr = numeric_attr(e, b"nr")?;
                    let counters = LineCounters {
                        instruction: Counter::new(numeric_attr(e, b"mi")?, numeric_attr(e, b"ci")?),
                        branch: Counter::new(numeric_attr(e, b"mb")?, numeric_attr(e, b"cb")?),
                    };
                    let entry = lines.entry(nr).or_default();
                    *entry = entry.merge(counters);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"group" => {
                self.groups.pop();
            }
            b"method" => {
                if let (Some(method), Some(class)) = (self.method.take(), self.class.as_mut()) {
                    class.methods.push(method);
                }
            }
            b"class" => {
                if let Some(class) = self.class.take() {
                    let group = self.group_name();
                    self.package
                        .get_or_insert_with(|| PendingPackage {
                            group,
                            ..PendingPackage::default()
                        })
                        .classes
                        .push(class);
                }
            }
            b"sourcefile" => {
                if let (Some((file, lines)), Some(package)) =
                    (self.sourcefile.take(), self.package.as_mut())
                {
                    package.sourcefiles.insert(file, lines);
                }
            }
            b"package" | b"report" => {
                if let Some(package) = self.package.take() {
                    finish_package(package, &mut self.out);
                }
            }
            _ => {}
        }
    }

    fn record_counter(&mut self, e: &BytesStart<'_>) -> Result<(), CoverageParseError> {
        let kind = required_attr(e, b"type")?;
        let Some(entity) = counter_entity(&kind) else {
            return Ok(());
        };
        let counter = Counter::new(numeric_attr(e, b"missed")?, numeric_attr(e, b"covered")?);

        if let Some(method) = self.method.as_mut() {
            match entity {
                CoverageEntity::Complexity => method.complexity = counter,
                CoverageEntity::Method => method.method = counter,
                _ => {}
            }
        } else if let Some(class) = self.class.as_mut() {
            *class.counters.get_mut(entity) = counter;
        }
        // Sourcefile, package and report totals are derived data.
        Ok(())
    }
}

fn counter_entity(kind: &str) -> Option<CoverageEntity> {
    match kind {
        "INSTRUCTION" => Some(CoverageEntity::Instruction),
        "BRANCH" => Some(CoverageEntity::Branch),
        "LINE" => Some(CoverageEntity::Line),
        "COMPLEXITY" => Some(CoverageEntity::Complexity),
        "METHOD" => Some(CoverageEntity::Method),
        _ => None,
    }
}

/// Join classes with their source file lines and emit records in document order.
fn finish_package(package: PendingPackage, out: &mut Vec<RawCoverageData>) {
    // Method first lines per source file, across all classes, so that inner
    // classes cut the spans of the enclosing class's methods. Each start is
    // owned by one class; ties go to the lexically smallest class name.
    let mut owners: BTreeMap<&str, BTreeMap<u32, &str>> = BTreeMap::new();
    for class in &package.classes {
        let Some(file) = class.source_file.as_deref() else {
            continue;
        };
        let file_owners = owners.entry(file).or_default();
        for start in class.methods.iter().filter_map(|m| m.first_line) {
            let owner = file_owners.entry(start).or_insert(class.class_name.as_str());
            if class.class_name.as_str() < *owner {
                *owner = class.class_name.as_str();
            }
        }
    }

    let mut records = Vec::with_capacity(package.classes.len());
    for class in &package.classes {
        let detail = class.source_file.as_deref().and_then(|file| {
            let lines = package.sourcefiles.get(file)?;
            let file_owners = owners.get(file)?;
            class_detail(class, lines, file_owners)
        });
        records.push(RawCoverageData {
            group: package.group.clone(),
            class_name: class.class_name.clone(),
            source_file: class.source_file.clone(),
            counters: class.counters,
            detail,
        });
    }
    out.extend(records);
}

/// Method spans of one class plus the source lines it owns.
///
/// A line belongs to the owner of the closest method start at or before it,
/// so no line is counted for two classes.
fn class_detail(
    class: &PendingClass,
    lines: &BTreeMap<u32, LineCounters>,
    owners: &BTreeMap<u32, &str>,
) -> Option<ClassDetail> {
    let last_recorded = lines.keys().next_back().copied().unwrap_or(0);

    let mut methods: Vec<MethodCoverage> = class
        .methods
        .iter()
        .filter_map(|m| {
            let first_line = m.first_line?;
            let next_start = owners
                .range(first_line.saturating_add(1)..)
                .next()
                .map(|(start, _)| *start);
            let last_line = match next_start {
                Some(next) => next - 1,
                None => last_recorded,
            }
            .max(first_line);
            Some(MethodCoverage {
                name: m.name.clone(),
                descriptor: m.descriptor.clone(),
                first_line,
                last_line,
                complexity: m.complexity,
                method: m.method,
            })
        })
        .collect();

    if methods.is_empty() {
        return None;
    }
    methods.sort_by(|a, b| {
        (a.first_line, &a.name, &a.descriptor).cmp(&(b.first_line, &b.name, &b.descriptor))
    });

    let class_lines = lines
        .iter()
        .filter(|(nr, _)| {
            owners
                .range(..=**nr)
                .next_back()
                .is_some_and(|(_, owner)| *owner == class.class_name)
        })
        .map(|(nr, c)| (*nr, *c))
        .collect();

    Some(ClassDetail {
        lines: class_lines,
        methods,
    })
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CoverageParseError> {
    for attribute in e.attributes() {
        let attribute =
            attribute.map_err(|err| CoverageParseError::MalformedXml(err.to_string()))?;
        if attribute.key.as_ref() == key {
            let value = attribute
                .unescape_value()
                .map_err(|err| CoverageParseError::MalformedXml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(e: &BytesStart<'_>, key: &[u8]) -> Result<String, CoverageParseError> {
    attr(e, key)?.ok_or_else(|| {
        CoverageParseError::MalformedXml(format!(
            "<{}> is missing attribute '{}'",
            String::from_utf8_lossy(e.name().as_ref()),
            String::from_utf8_lossy(key)
        ))
    })
}

fn numeric_attr(e: &BytesStart<'_>, key: &[u8]) -> Result<u32, CoverageParseError> {
    let value = required_attr(e, key)?;
    parse_number(e, key, &value)
}

fn parse_number(e: &BytesStart<'_>, key: &[u8], value: &str) -> Result<u32, CoverageParseError> {
    value.trim().parse::<u32>().map_err(|_| {
        CoverageParseError::MalformedXml(format!(
            "<{}> attribute '{}' is not a non-negative integer: '{}'",
            String::from_utf8_lossy(e.name().as_ref()),
            String::from_utf8_lossy(key),
            value
        ))
    })
}
