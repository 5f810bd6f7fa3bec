use serde::Serialize;

use crate::model::{Role, Student, User};

/// Dashboard sections, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Dashboard,
    Santri,
    Pengajar,
    Cabang,
    Absensi,
    Rapor,
    Ujian,
    Infaq,
    Bisyaroh,
    Transaksi,
    Struktur,
    Kalender,
    Pengaturan,
}

impl Section {
    pub const ALL: [Section; 13] = [
        Section::Dashboard,
        Section::Santri,
        Section::Pengajar,
        Section::Cabang,
        Section::Absensi,
        Section::Rapor,
        Section::Ujian,
        Section::Infaq,
        Section::Bisyaroh,
        Section::Transaksi,
        Section::Struktur,
        Section::Kalender,
        Section::Pengaturan,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Santri => "santri",
            Section::Pengajar => "pengajar",
            Section::Cabang => "cabang",
            Section::Absensi => "absensi",
            Section::Rapor => "rapor",
            Section::Ujian => "ujian",
            Section::Infaq => "infaq",
            Section::Bisyaroh => "bisyaroh",
            Section::Transaksi => "transaksi",
            Section::Struktur => "struktur",
            Section::Kalender => "kalender",
            Section::Pengaturan => "pengaturan",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        Self::ALL.into_iter().find(|s| s.id().eq_ignore_ascii_case(t))
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Santri => "Data Santri",
            Section::Pengajar => "Data Pengajar & Staf",
            Section::Cabang => "Data Cabang",
            Section::Absensi => "Rekap Absensi",
            Section::Rapor => "Rekap Mu'taba'ah",
            Section::Ujian => "Rekap Hasil Ujian",
            Section::Infaq => "Rekap Infaq (SPP)",
            Section::Bisyaroh => "Rekap Bisyaroh",
            Section::Transaksi => "Transaksi Keuangan",
            Section::Struktur => "Struktur Lembaga",
            Section::Kalender => "Kalender Akademik",
            Section::Pengaturan => "Pengaturan",
        }
    }
}

pub fn section_visible(role: Role, section: Section) -> bool {
    use Role::*;
    match section {
        Section::Santri | Section::Transaksi => matches!(role, Admin | Staff),
        Section::Pengajar | Section::Cabang => role == Admin,
        Section::Infaq => matches!(role, Admin | Staff | Guardian),
        Section::Bisyaroh => matches!(role, Admin | Teacher | Staff),
        Section::Dashboard
        | Section::Absensi
        | Section::Rapor
        | Section::Ujian
        | Section::Struktur
        | Section::Kalender
        | Section::Pengaturan => true,
    }
}

pub fn menu(role: Role) -> Vec<Section> {
    Section::ALL
        .into_iter()
        .filter(|s| section_visible(role, *s))
        .collect()
}

/// Exam scores are entered by teachers only; everyone else views.
pub fn can_edit_exams(role: Role) -> bool {
    role == Role::Teacher
}

pub fn can_manage_students(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Staff)
}

/// Teachers see their own santri, guardians the one whose NIS is their
/// username, admin and staff everyone.
pub fn can_view_student(user: &User, student: &Student) -> bool {
    match user.role {
        Role::Admin | Role::Staff => true,
        Role::Teacher => student.teacher_id == user.id,
        Role::Guardian => user.username.as_deref() == Some(student.id.as_str()),
    }
}

pub fn visible_students<'a>(user: &User, students: &'a [Student]) -> Vec<&'a Student> {
    students
        .iter()
        .filter(|s| can_view_student(user, s))
        .collect()
}
