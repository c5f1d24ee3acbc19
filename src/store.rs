use crate::auth::CredentialVerifier;
use crate::db::{self, StoreConfig};
use crate::error::{SchoolError, SchoolResult};
use crate::grades::GradeScale;
use crate::models::{Class, ClassSummary, NewStudent, Role, Student, StudentWithClass};
use rusqlite::{Connection, OptionalExtension, Row};

const STUDENT_COLUMNS: &str = "s.id, s.name, s.section, s.roll, s.gender, s.notebook, \
     s.copy_checked, s.projects, s.marks, s.grade, s.class_id";

/// Typed access to the users, classes and students tables over one
/// connection. Dropped at the end of each request.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    pub fn open(config: &StoreConfig) -> SchoolResult<Self> {
        Ok(RecordStore {
            conn: db::connect(config)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        RecordStore { conn }
    }

    pub fn initialize_schema(&self, verifier: &dyn CredentialVerifier) -> SchoolResult<()> {
        db::initialize_schema(&self.conn, verifier)
    }

    /// `Ok(None)` is a normal negative result (unknown user or wrong password).
    pub fn find_user_by_credentials(
        &self,
        username: &str,
        password: &str,
        verifier: &dyn CredentialVerifier,
    ) -> SchoolResult<Option<Role>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT password, role FROM users WHERE username = ?",
                [username],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((stored, role)) = row else {
            return Ok(None);
        };
        if !verifier.verify(password, &stored)? {
            return Ok(None);
        }
        match role.parse::<Role>() {
            Ok(role) => Ok(Some(role)),
            Err(e) => {
                tracing::warn!(
                    username,
                    error = %e,
                    "stored user has an unknown role; login refused"
                );
                Ok(None)
            }
        }
    }

    pub fn count_users(&self) -> SchoolResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
    }

    pub fn create_class(&self, name: &str) -> SchoolResult<Class> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchoolError::InvalidInput("name must not be empty".into()));
        }
        self.conn
            .execute("INSERT INTO classes(name) VALUES(?)", [name])?;
        Ok(Class {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub fn list_classes(&self) -> SchoolResult<Vec<ClassSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
               c.id,
               c.name,
               (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count
             FROM classes c
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(ClassSummary {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    student_count: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn class_exists(&self, class_id: i64) -> SchoolResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM classes WHERE id = ?", [class_id], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts a student. When `grade` is absent and `marks` is present the
    /// grade comes from `scale`; an explicit grade is stored verbatim.
    pub fn create_student(&self, new: &NewStudent, scale: &GradeScale) -> SchoolResult<Student> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(SchoolError::InvalidInput("name must not be empty".into()));
        }
        if let Some(class_id) = new.class_id {
            if !self.class_exists(class_id)? {
                tracing::warn!(
                    class_id,
                    student = name,
                    "student references a missing class; it will not appear in class analytics"
                );
            }
        }

        let grade = match (&new.grade, new.marks) {
            (Some(g), _) => Some(g.clone()),
            (None, Some(m)) => Some(scale.grade_for(m).to_string()),
            (None, None) => None,
        };

        self.conn.execute(
            "INSERT INTO students(
               name, section, roll, gender, notebook, copy_checked, projects, marks, grade, class_id
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                name,
                new.section.trim(),
                new.roll,
                new.gender,
                new.notebook,
                new.copy_checked,
                new.projects,
                new.marks,
                grade,
                new.class_id,
            ],
        )?;

        Ok(Student {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            section: new.section.trim().to_string(),
            roll: new.roll,
            gender: new.gender.clone(),
            notebook: new.notebook,
            copy_checked: new.copy_checked,
            projects: new.projects,
            marks: new.marks,
            grade,
            class_id: new.class_id,
        })
    }

    /// Every student, in insertion order, with the class name when the class
    /// resolves.
    pub fn list_students_with_class(&self) -> SchoolResult<Vec<StudentWithClass>> {
        let sql = format!(
            "SELECT {STUDENT_COLUMNS}, c.name
             FROM students s LEFT JOIN classes c ON c.id = s.class_id
             ORDER BY s.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |r| {
                Ok(StudentWithClass {
                    student: student_from_row(r)?,
                    class_name: r.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `(class name, mean marks)` per class with at least one marked student.
    pub fn aggregate_by_class(&self) -> SchoolResult<Vec<(String, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name, AVG(s.marks)
             FROM classes c JOIN students s ON c.id = s.class_id
             GROUP BY c.id
             HAVING COUNT(s.marks) > 0",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `(grade, count)` per literal grade value; NULL grades are skipped.
    pub fn aggregate_by_grade(&self) -> SchoolResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT grade, COUNT(*)
             FROM students
             WHERE grade IS NOT NULL
             GROUP BY grade",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn class_student_counts(&self) -> SchoolResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name, COUNT(s.id)
             FROM classes c JOIN students s ON c.id = s.class_id
             GROUP BY c.id",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// `(class id, name, student count, mean marks)` per class with at least
    /// one student. Count and mean come from the same group, so classes that
    /// share a name stay apart. The mean is `None` when no student is marked.
    pub fn class_summaries(&self) -> SchoolResult<Vec<(i64, String, i64, Option<f64>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, COUNT(s.id), AVG(s.marks)
             FROM classes c JOIN students s ON c.id = s.class_id
             GROUP BY c.id
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn student_marks(&self) -> SchoolResult<Vec<(String, Option<i64>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, marks FROM students ORDER BY id")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        section: r.get(2)?,
        roll: r.get(3)?,
        gender: r.get(4)?,
        notebook: r.get::<_, i64>(5)? != 0,
        copy_checked: r.get::<_, i64>(6)? != 0,
        projects: r.get(7)?,
        marks: r.get(8)?,
        grade: r.get(9)?,
        class_id: r.get(10)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::PlaintextVerifier;

    pub(crate) fn memory_store() -> RecordStore {
        let conn = Connection::open_in_memory().expect("open memory db");
        let store = RecordStore::from_connection(conn);
        store
            .initialize_schema(&PlaintextVerifier)
            .expect("init schema");
        store
    }

    pub(crate) fn student(
        name: &str,
        class_id: Option<i64>,
        marks: Option<i64>,
        grade: Option<&str>,
    ) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            class_id,
            marks,
            grade: grade.map(|g| g.to_string()),
            ..NewStudent::default()
        }
    }

    #[test]
    fn schema_init_is_idempotent() {
        let store = memory_store();
        store
            .initialize_schema(&PlaintextVerifier)
            .expect("second init");
        assert_eq!(store.count_users().unwrap(), 2);
    }

    #[test]
    fn credentials_resolve_roles() {
        let store = memory_store();
        let v = PlaintextVerifier;
        assert_eq!(
            store.find_user_by_credentials("admin", "admin123", &v).unwrap(),
            Some(Role::Admin)
        );
        assert_eq!(
            store
                .find_user_by_credentials("teacher", "teacher123", &v)
                .unwrap(),
            Some(Role::Teacher)
        );
        assert_eq!(
            store.find_user_by_credentials("admin", "wrong", &v).unwrap(),
            None
        );
        assert_eq!(
            store.find_user_by_credentials("nobody", "admin123", &v).unwrap(),
            None
        );
    }

    #[test]
    fn class_average_uses_inner_join() {
        let store = memory_store();
        let scale = GradeScale::default();
        let math = store.create_class("Math").unwrap();
        let art = store.create_class("Art").unwrap();
        store
            .create_student(&student("Ana", Some(math.id), Some(80), None), &scale)
            .unwrap();
        store
            .create_student(&student("Ben", Some(math.id), Some(90), None), &scale)
            .unwrap();
        store
            .create_student(&student("Orphan", Some(999), Some(10), None), &scale)
            .unwrap();

        let avgs = store.aggregate_by_class().unwrap();
        assert_eq!(avgs, vec![("Math".to_string(), 85.0)]);
        assert!(!avgs.iter().any(|(name, _)| name == &art.name));
    }

    #[test]
    fn class_without_marks_is_absent_not_zero() {
        let store = memory_store();
        let scale = GradeScale::default();
        let pe = store.create_class("PE").unwrap();
        store
            .create_student(&student("Cal", Some(pe.id), None, None), &scale)
            .unwrap();
        assert!(store.aggregate_by_class().unwrap().is_empty());
        assert_eq!(
            store.class_student_counts().unwrap(),
            vec![("PE".to_string(), 1)]
        );
    }

    #[test]
    fn class_summaries_keep_same_named_classes_apart() {
        let store = memory_store();
        let scale = GradeScale::default();
        let first = store.create_class("Math").unwrap();
        let second = store.create_class("Math").unwrap();
        store
            .create_student(&student("Ana", Some(first.id), None, None), &scale)
            .unwrap();
        store
            .create_student(&student("Ben", Some(second.id), Some(40), None), &scale)
            .unwrap();
        store
            .create_student(&student("Cal", Some(second.id), Some(60), None), &scale)
            .unwrap();

        assert_eq!(
            store.class_summaries().unwrap(),
            vec![
                (first.id, "Math".to_string(), 1, None),
                (second.id, "Math".to_string(), 2, Some(50.0)),
            ]
        );
    }

    #[test]
    fn unknown_stored_role_refuses_login() {
        let store = memory_store();
        store
            .conn
            .execute(
                "INSERT INTO users(username, password, role) VALUES('guest', 'guest1', 'superuser')",
                [],
            )
            .unwrap();
        assert_eq!(
            store
                .find_user_by_credentials("guest", "guest1", &PlaintextVerifier)
                .unwrap(),
            None
        );
    }

    #[test]
    fn grade_groups_are_literal_and_skip_null() {
        let store = memory_store();
        let scale = GradeScale::default();
        for (name, grade) in [("a", Some("A")), ("b", Some("a")), ("c", Some("A")), ("d", None)] {
            store
                .create_student(&student(name, None, None, grade), &scale)
                .unwrap();
        }
        let mut grades = store.aggregate_by_grade().unwrap();
        grades.sort();
        assert_eq!(
            grades,
            vec![("A".to_string(), 2), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn missing_grade_is_derived_from_marks() {
        let store = memory_store();
        let s = store
            .create_student(&student("Dee", None, Some(72), None), &GradeScale::default())
            .unwrap();
        assert_eq!(s.grade.as_deref(), Some("C"));

        let explicit = store
            .create_student(&student("Eve", None, Some(72), Some("b+")), &GradeScale::default())
            .unwrap();
        assert_eq!(explicit.grade.as_deref(), Some("b+"));
    }

    #[test]
    fn list_students_keeps_orphans() {
        let store = memory_store();
        let scale = GradeScale::default();
        let math = store.create_class("Math").unwrap();
        store
            .create_student(&student("Ana", Some(math.id), Some(80), None), &scale)
            .unwrap();
        store
            .create_student(&student("Orphan", Some(42), Some(50), None), &scale)
            .unwrap();
        let rows = store.list_students_with_class().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].class_name.as_deref(), Some("Math"));
        assert_eq!(rows[1].class_name, None);
    }

    #[test]
    fn blank_names_are_rejected() {
        let store = memory_store();
        assert!(matches!(
            store.create_class("  "),
            Err(SchoolError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create_student(&student(" ", None, None, None), &GradeScale::default()),
            Err(SchoolError::InvalidInput(_))
        ));
    }

    #[test]
    fn open_missing_database_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::in_workspace(dir.path(), "absent.db");
        assert!(matches!(
            RecordStore::open(&config),
            Err(SchoolError::StorageUnavailable(_))
        ));
    }
}
