use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

use crate::model::{Branch, Program, Role, Student, StudentStatus, User};

/// Starting dataset. Either the built-in demo network or a JSON file with the
/// same three arrays.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Seed {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&text)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        let mut seen = std::collections::HashSet::new();
        for s in &seed.students {
            if !seen.insert(s.id.as_str()) {
                anyhow::bail!("duplicate student id {} in {}", s.id, path.display());
            }
        }
        Ok(seed)
    }

    pub fn demo() -> Self {
        Self {
            branches: demo_branches(),
            users: demo_users(),
            students: demo_students(),
        }
    }
}

fn demo_branches() -> Vec<Branch> {
    vec![
        Branch {
            id: "BR_MADANI".into(),
            name: "Tuntaz Masjid Madani".into(),
            address: "Jl. Masjid Madani No. 1, Surabaya".into(),
            phone: Some("081234567001".into()),
            head_name: Some("Ust. Sayyadi".into()),
        },
        Branch {
            id: "BR_NGAGEL".into(),
            name: "Tuntaz Ngagel".into(),
            address: "Jl. Ngagel Rejo No. 10, Surabaya".into(),
            phone: Some("081234567002".into()),
            head_name: Some("Ust. Choiron".into()),
        },
    ]
}

fn user(id: &str, name: &str, username: &str, role: Role, branch: Option<&str>) -> User {
    User {
        id: id.into(),
        name: name.into(),
        role,
        username: Some(username.into()),
        email: None,
        phone: None,
        branch: branch.map(str::to_string),
        is_active: true,
    }
}

fn demo_users() -> Vec<User> {
    let mut sayyadi = user(
        "u_sayyadi",
        "Ustadz Sayyadi",
        "sayyadi",
        Role::Teacher,
        Some("Tuntaz Masjid Madani"),
    );
    sayyadi.phone = Some("081211112222".into());
    let mut choiron = user(
        "u_choiron",
        "Ustadz Choiron",
        "choiron",
        Role::Teacher,
        Some("Tuntaz Ngagel"),
    );
    choiron.phone = Some("081233334444".into());

    vec![
        user("admin1", "Admin Pusat", "admin", Role::Admin, None),
        sayyadi,
        choiron,
        user(
            "staf1",
            "Staf Administrasi",
            "staf",
            Role::Staff,
            Some("Tuntaz Masjid Madani"),
        ),
        user("g1", "Wali Santri Ahmad", "NIS001", Role::Guardian, None),
    ]
}

// (nis, name, grade, program, parent, phone, infaq)
type Row = (&'static str, &'static str, &'static str, Program, &'static str, &'static str, i64);

const MADANI_ROWS: &[Row] = &[
    ("NIS001", "Ahmad Fikri", "Juz 30", Program::Tahfidz, "Bpk. Fikri", "0811111", 200000),
    ("NIS002", "Budi Santoso", "Level 1", Program::Tahsin, "Bpk. Santoso", "0811112", 150000),
    ("NIS003", "Citra Kirana", "Juz 29", Program::Tahfidz, "Bpk. Kirana", "0811113", 250000),
    ("NIS004", "Dewi Sartika", "Level 2", Program::Tahsin, "Bpk. Sartika", "0811114", 150000),
    ("NIS005", "Eko Prasetyo", "Juz 30", Program::Tahfidz, "Bpk. Prasetyo", "0811115", 200000),
    ("NIS006", "Fajar Nugraha", "Level 3", Program::Tahsin, "Bpk. Nugraha", "0811116", 175000),
    ("NIS007", "Gita Gutawa", "Juz 1", Program::Tahfidz, "Bpk. Gutawa", "0811117", 300000),
    ("NIS008", "Hadi Sucipto", "Level 1", Program::Tahsin, "Bpk. Sucipto", "0811118", 150000),
    ("NIS009", "Indah Permata", "Juz 30", Program::Tahfidz, "Bpk. Permata", "0811119", 200000),
    ("NIS010", "Joko Anwar", "Level 2", Program::Tahsin, "Bpk. Anwar", "0811120", 150000),
];

const NGAGEL_ROWS: &[Row] = &[
    ("NIS011", "Kiki Amalia", "Level 3", Program::Tahsin, "Bpk. Amalia", "0822221", 175000),
    ("NIS012", "Lukman Hakim", "Juz 30", Program::Tahfidz, "Bpk. Hakim", "0822222", 200000),
    ("NIS013", "Mira Lesmana", "Level 1", Program::Tahsin, "Bpk. Lesmana", "0822223", 150000),
    ("NIS014", "Nanda Putra", "Juz 29", Program::Tahfidz, "Bpk. Putra", "0822224", 250000),
    ("NIS015", "Omar Daniel", "Level 2", Program::Tahsin, "Bpk. Daniel", "0822225", 150000),
    ("NIS016", "Putri Titian", "Juz 30", Program::Tahfidz, "Bpk. Titian", "0822226", 200000),
    ("NIS017", "Qori Sandioriva", "Level 3", Program::Tahsin, "Bpk. Sandioriva", "0822227", 175000),
    ("NIS018", "Rina Nose", "Juz 28", Program::Tahfidz, "Bpk. Nose", "0822228", 300000),
    ("NIS019", "Sari Roti", "Level 1", Program::Tahsin, "Bpk. Roti", "0822229", 150000),
    ("NIS020", "Tono Sudirjo", "Level 2", Program::Tahsin, "Bpk. Sudirjo", "0822230", 150000),
];

fn demo_students() -> Vec<Student> {
    let groups = [
        ("Tuntaz Masjid Madani", "u_sayyadi", MADANI_ROWS),
        ("Tuntaz Ngagel", "u_choiron", NGAGEL_ROWS),
    ];
    groups
        .iter()
        .flat_map(|(branch, teacher, rows)| {
            rows.iter()
                .map(move |(id, name, grade, program, parent, phone, infaq)| Student {
                    id: id.to_string(),
                    name: name.to_string(),
                    branch: branch.to_string(),
                    teacher_id: teacher.to_string(),
                    grade: grade.to_string(),
                    program: *program,
                    status: StudentStatus::Active,
                    parent_name: parent.to_string(),
                    phone: phone.to_string(),
                    address: None,
                    school: None,
                    email: None,
                    infaq_amount: Some(*infaq),
                })
        })
        .collect()
}
