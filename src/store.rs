use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{parse_calendar_date, Activity, ActivityStatus, ActivityType, Role, User};

const USERS_FILE: &str = "users.json";
const ACTIVITIES_FILE: &str = "activities.json";

/// Frozen copy of the working set the report core reads from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub activities: Vec<Activity>,
    pub users: Vec<User>,
}

/// Source of activity and user records.
pub trait RecordStore {
    fn snapshot(&self) -> Result<Snapshot, StoreError>;
}

impl RecordStore for Snapshot {
    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.clone())
    }
}

/// Directory holding one JSON blob per collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory and empty collections that do not exist yet.
    pub fn init(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for name in [USERS_FILE, ACTIVITIES_FILE] {
            let path = self.dir.join(name);
            if !path.exists() {
                write_json(&path, &Vec::<serde_json::Value>::new())?;
            }
        }

        Ok(())
    }

    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        read_json(&self.dir.join(USERS_FILE))
    }

    pub fn activities(&self) -> Result<Vec<Activity>, StoreError> {
        read_json(&self.dir.join(ACTIVITIES_FILE))
    }

    pub fn save_users(&self, users: &[User]) -> Result<(), StoreError> {
        write_json(&self.dir.join(USERS_FILE), users)
    }

    pub fn save_activities(&self, activities: &[Activity]) -> Result<(), StoreError> {
        write_json(&self.dir.join(ACTIVITIES_FILE), activities)
    }

    /// Writes the sample dataset into whichever collections are still empty.
    /// Returns `true` when anything was written.
    pub fn seed(&self) -> Result<bool, StoreError> {
        self.init()?;
        let sample = sample_snapshot();
        let mut seeded = false;

        if self.users()?.is_empty() {
            self.save_users(&sample.users)?;
            seeded = true;
        }
        if self.activities()?.is_empty() {
            self.save_activities(&sample.activities)?;
            seeded = true;
        }

        Ok(seeded)
    }

    /// Imports activities from CSV, upserting students by email. Rows whose id
    /// already exists are skipped. Nothing is written if any row is invalid.
    pub fn import_csv(&self, csv_path: &Path) -> Result<usize, StoreError> {
        #[derive(serde::Deserialize)]
        struct CsvRow {
            student_name: String,
            student_email: String,
            course: Option<String>,
            year: Option<u32>,
            #[serde(rename = "type")]
            activity_type: String,
            title: String,
            #[serde(default)]
            description: String,
            date: String,
            status: Option<String>,
            reviewed_by: Option<String>,
            feedback: Option<String>,
            reviewed_at: Option<String>,
            id: Option<String>,
        }

        let mut users = self.users()?;
        let mut activities = self.activities()?;
        let mut reader = csv::Reader::from_path(csv_path)?;
        let mut inserted = 0usize;

        for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
            let line = index as u64 + 2;
            let row = result?;
            let invalid = |reason: String| StoreError::InvalidRow { line, reason };

            let activity_type: ActivityType = row
                .activity_type
                .parse()
                .map_err(|err: crate::error::ParseError| invalid(err.to_string()))?;
            let status = match row.status.as_deref() {
                Some(value) => value
                    .parse()
                    .map_err(|err: crate::error::ParseError| invalid(err.to_string()))?,
                None => ActivityStatus::Pending,
            };
            let date: NaiveDate = parse_calendar_date(&row.date)
                .ok_or_else(|| invalid(format!("invalid date '{}'", row.date)))?;

            let student_id = upsert_student(
                &mut users,
                &row.student_name,
                &row.student_email,
                row.course,
                row.year,
            );

            let id = row
                .id
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
            if activities.iter().any(|existing| existing.id == id) {
                tracing::debug!(id = %id, line, "activity already present, skipping");
                continue;
            }

            let activity = Activity {
                id,
                student_id,
                student_name: row.student_name,
                activity_type,
                title: row.title,
                description: row.description,
                date,
                file_url: None,
                file_name: None,
                status,
                feedback: row.feedback,
                reviewed_by: row.reviewed_by,
                reviewed_at: row.reviewed_at,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            };

            if !activity.review_fields_consistent() {
                return Err(invalid(
                    "reviewer fields must be set exactly when status is approved or rejected"
                        .to_string(),
                ));
            }

            activities.push(activity);
            inserted += 1;
        }

        self.save_users(&users)?;
        self.save_activities(&activities)?;
        Ok(inserted)
    }
}

impl RecordStore for JsonStore {
    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let users = self.users()?;
        let activities = self.activities()?;

        for activity in activities.iter().filter(|a| !a.review_fields_consistent()) {
            tracing::warn!(
                id = %activity.id,
                status = %activity.status,
                "reviewer fields do not match activity status"
            );
        }

        tracing::debug!(
            users = users.len(),
            activities = activities.len(),
            dir = %self.dir.display(),
            "loaded record snapshot"
        );

        Ok(Snapshot { activities, users })
    }
}

fn upsert_student(
    users: &mut Vec<User>,
    name: &str,
    email: &str,
    course: Option<String>,
    year: Option<u32>,
) -> String {
    if let Some(existing) = users.iter_mut().find(|user| user.email == email) {
        existing.name = name.to_string();
        if course.is_some() {
            existing.course = course;
        }
        if year.is_some() {
            existing.year = year;
        }
        return existing.id.clone();
    }

    let id = Uuid::new_v4().to_string();
    users.push(User {
        id: id.clone(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Student,
        course,
        branch: None,
        year,
        department: None,
        extra: BTreeMap::new(),
    });
    id
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Two students, two faculty members and three activities.
pub fn sample_snapshot() -> Snapshot {
    let student = |id: &str, email: &str, name: &str, course: &str, branch: &str, year: u32| User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Student,
        course: Some(course.to_string()),
        branch: Some(branch.to_string()),
        year: Some(year),
        department: None,
        extra: BTreeMap::new(),
    };
    let faculty = |id: &str, email: &str, name: &str, department: &str| User {
        id: id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Faculty,
        course: None,
        branch: None,
        year: None,
        department: Some(department.to_string()),
        extra: BTreeMap::new(),
    };

    let users = vec![
        student(
            "1",
            "student1@university.edu",
            "Alice Johnson",
            "Computer Science",
            "Software Engineering",
            3,
        ),
        student(
            "2",
            "student2@university.edu",
            "Bob Smith",
            "Electrical Engineering",
            "Electronics",
            2,
        ),
        faculty(
            "3",
            "faculty1@university.edu",
            "Dr. Sarah Wilson",
            "Computer Science",
        ),
        faculty(
            "4",
            "faculty2@university.edu",
            "Prof. Michael Brown",
            "Electrical Engineering",
        ),
    ];

    let activities = vec![
        Activity {
            id: "1".to_string(),
            student_id: "1".to_string(),
            student_name: "Alice Johnson".to_string(),
            activity_type: ActivityType::Academic,
            title: "Research Paper on Machine Learning".to_string(),
            description: "Published research paper on deep learning algorithms in IEEE conference"
                .to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            file_url: None,
            file_name: None,
            status: ActivityStatus::Approved,
            feedback: Some("Excellent research work with significant contributions".to_string()),
            reviewed_by: Some("Dr. Sarah Wilson".to_string()),
            reviewed_at: Some("2024-01-20".to_string()),
            created_at: "2024-01-15".to_string(),
        },
        Activity {
            id: "2".to_string(),
            student_id: "1".to_string(),
            student_name: "Alice Johnson".to_string(),
            activity_type: ActivityType::Extracurricular,
            title: "Hackathon Winner".to_string(),
            description:
                "Won first place in university-wide hackathon with innovative mobile app"
                    .to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap_or_default(),
            file_url: None,
            file_name: None,
            status: ActivityStatus::Pending,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: "2024-02-10".to_string(),
        },
        Activity {
            id: "3".to_string(),
            student_id: "2".to_string(),
            student_name: "Bob Smith".to_string(),
            activity_type: ActivityType::Volunteering,
            title: "Community Tech Support".to_string(),
            description: "Volunteered to provide tech support for elderly community members"
                .to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 25).unwrap_or_default(),
            file_url: None,
            file_name: None,
            status: ActivityStatus::Approved,
            feedback: Some("Great community service initiative".to_string()),
            reviewed_by: Some("Prof. Michael Brown".to_string()),
            reviewed_at: Some("2024-01-30".to_string()),
            created_at: "2024-01-25".to_string(),
        },
    ];

    Snapshot { activities, users }
}
