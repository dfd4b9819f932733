// src/adapters/course_pack.rs

//! Course Pack output: normalized teacher and program tables plus a tree of
//! department entities holding the courses.
//!
//! Ids are content hashes, so the same input always produces the same pack.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::adapters::Adapter;
use crate::error::Result;
use crate::models::CourseDetail;

const SCHEMA: &str = "https://esm.sh/course-pack/schema.json";

/// Keys lifted out of a course record; everything else lands in `extra`.
const COURSE_FIELDS: [&str; 8] = [
    "name",
    "description",
    "code",
    "year",
    "term",
    "credit",
    "teachers",
    "programs",
];

pub struct CoursePackAdapter {
    university: String,
}

impl CoursePackAdapter {
    pub const ID: &'static str = "course-pack";

    pub fn new(university: impl Into<String>) -> Self {
        Self {
            university: university.into(),
        }
    }
}

impl Default for CoursePackAdapter {
    fn default() -> Self {
        Self::new("國立臺灣師範大學")
    }
}

#[derive(Debug, Serialize)]
struct Named {
    id: String,
    name: String,
}

/// Entity tree node; children refer to other nodes by index.
struct Entity {
    name: String,
    courses: Vec<Value>,
    children: Vec<usize>,
}

impl Entity {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            courses: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl Adapter for CoursePackAdapter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn process(&self, mut courses: Vec<CourseDetail>) -> Result<Value> {
        log::info!("Adapting {} courses to Course Pack", courses.len());

        // Teachers are per department: the same name in two departments is two people.
        let mut teacher_ids: BTreeMap<(String, String), String> = BTreeMap::new();
        let mut program_ids: BTreeMap<String, String> = BTreeMap::new();
        for course in &courses {
            let department = &course.meta.department;
            for teacher in &course.meta.teachers {
                teacher_ids
                    .entry((department.clone(), teacher.clone()))
                    .or_insert_with(|| hashed_id(&["teacher", department.as_str(), teacher.as_str()]));
            }
            for program in &course.meta.programs {
                program_ids
                    .entry(program.clone())
                    .or_insert_with(|| hashed_id(&["program", program.as_str()]));
            }
        }

        let mut teachers: Vec<Named> = teacher_ids
            .iter()
            .map(|((_, name), id)| Named {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();
        teachers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let programs: Vec<Named> = program_ids
            .iter()
            .map(|(name, id)| Named {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();

        // Short codes first so parents exist before their children.
        courses.sort_by_key(|c| c.meta.department.len());

        let mut entities = vec![Entity::new(&self.university)];
        let mut by_department: HashMap<String, usize> = HashMap::new();

        for course in courses {
            let department = course.meta.department.clone();
            let index = match by_department.get(&department) {
                Some(&index) => index,
                None => {
                    let parent = if department.chars().count() <= 2 {
                        0
                    } else {
                        department
                            .chars()
                            .next()
                            .and_then(|first| by_department.get(&first.to_string()).copied())
                            .unwrap_or(0)
                    };
                    entities.push(Entity::new(&department));
                    let index = entities.len() - 1;
                    entities[parent].children.push(index);
                    by_department.insert(department.clone(), index);
                    index
                }
            };

            let packed = pack_course(course, &teacher_ids, &program_ids)?;
            entities[index].courses.push(packed);
        }

        Ok(json!({
            "$schema": SCHEMA,
            "teachers": teachers,
            "programs": programs,
            "entities": [render(&entities, 0)],
        }))
    }
}

fn pack_course(
    course: CourseDetail,
    teacher_ids: &BTreeMap<(String, String), String>,
    program_ids: &BTreeMap<String, String>,
) -> Result<Value> {
    let department = course.meta.department.clone();
    let teachers: Vec<&String> = course
        .meta
        .teachers
        .iter()
        .filter_map(|t| teacher_ids.get(&(department.clone(), t.clone())))
        .collect();
    let programs: Vec<&String> = course
        .meta
        .programs
        .iter()
        .filter_map(|p| program_ids.get(p))
        .collect();

    let id = hashed_id(&[
        "course",
        course.meta.year.to_string().as_str(),
        course.meta.term.to_string().as_str(),
        course.meta.serial.to_string().as_str(),
    ]);

    let mut packed = Map::new();
    packed.insert("id".into(), Value::String(id));
    packed.insert("name".into(), json!(course.meta.name));
    packed.insert("description".into(), json!(course.description));
    packed.insert("code".into(), json!(course.meta.code));
    packed.insert("year".into(), json!(course.meta.year));
    packed.insert("term".into(), json!(course.meta.term));
    packed.insert("credit".into(), json!(course.meta.credit));
    packed.insert("teachers".into(), json!(teachers));
    packed.insert("programs".into(), json!(programs));
    packed.insert("prerequisites".into(), json!([]));

    let mut extra = Map::new();
    if let Value::Object(fields) = serde_json::to_value(&course)? {
        for (key, value) in fields {
            if !COURSE_FIELDS.contains(&key.as_str()) {
                extra.insert(key, value);
            }
        }
    }
    packed.insert("extra".into(), Value::Object(extra));

    Ok(Value::Object(packed))
}

fn render(entities: &[Entity], index: usize) -> Value {
    let entity = &entities[index];
    json!({
        "name": entity.name,
        "courses": entity.courses,
        "children": entity
            .children
            .iter()
            .map(|&child| render(entities, child))
            .collect::<Vec<_>>(),
    })
}

fn hashed_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(&hasher.finalize()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn course(department: &str, serial: u32, teachers: &[&str], programs: &[&str]) -> CourseDetail {
        let mut meta = fixtures::meta(department, &format!("{department}{serial}"), serial);
        meta.teachers = teachers.iter().map(|t| t.to_string()).collect();
        meta.programs = programs.iter().map(|p| p.to_string()).collect();
        fixtures::detail(&meta)
    }

    #[test]
    fn test_tables_are_deduplicated() {
        let pack = CoursePackAdapter::default()
            .process(vec![
                course("CS", 1, &["Lin", "Wang"], &["AI"]),
                course("CS", 2, &["Lin"], &["AI", "Data"]),
                course("MA", 3, &["Lin"], &[]),
            ])
            .unwrap();

        // Lin in CS and Lin in MA are distinct teachers.
        assert_eq!(pack["teachers"].as_array().unwrap().len(), 3);
        assert_eq!(pack["programs"].as_array().unwrap().len(), 2);
        assert_eq!(pack["$schema"], SCHEMA);
    }

    #[test]
    fn test_department_tree() {
        let pack = CoursePackAdapter::new("U")
            .process(vec![
                course("E", 1, &[], &[]),
                course("EU", 2, &[], &[]),
                course("EUA", 3, &[], &[]),
                course("XYZ", 4, &[], &[]),
            ])
            .unwrap();

        let root = &pack["entities"][0];
        assert_eq!(root["name"], "U");

        let names: Vec<&str> = root["children"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["E", "EU", "XYZ"]);

        let e = &root["children"][0];
        assert_eq!(e["children"][0]["name"], "EUA");
        assert_eq!(e["courses"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_course_fields_and_extra() {
        let pack = CoursePackAdapter::default()
            .process(vec![course("CS", 7, &["Lin"], &["AI"])])
            .unwrap();

        let packed = &pack["entities"][0]["children"][0]["courses"][0];
        assert_eq!(packed["year"], 110);
        assert_eq!(packed["teachers"][0], pack["teachers"][0]["id"]);
        assert_eq!(packed["programs"][0], pack["programs"][0]["id"]);
        assert_eq!(packed["extra"]["serial"], 7);
        assert_eq!(packed["extra"]["hours"], 3);
        assert!(packed["extra"].get("name").is_none());
    }

    #[test]
    fn test_ids_are_stable() {
        let a = CoursePackAdapter::default()
            .process(vec![course("CS", 1, &["Lin"], &[])])
            .unwrap();
        let b = CoursePackAdapter::default()
            .process(vec![course("CS", 1, &["Lin"], &[])])
            .unwrap();
        assert_eq!(a, b);
    }
}
