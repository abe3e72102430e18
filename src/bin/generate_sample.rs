//! Writes synthetic student tables in both supported layouts:
//! `student_habits_performance.{csv,parquet}` and `StudentPerformanceFactors.csv`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next_u64() % options.len() as u64) as usize]
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

const GENDERS: [&str; 3] = ["Female", "Male", "Other"];
const HABITS_EDUCATION: [&str; 4] = ["None", "High School", "Bachelor", "Master"];
const FACTORS_EDUCATION: [&str; 3] = ["High School", "College", "Postgraduate"];
const LEVELS: [&str; 3] = ["Low", "Medium", "High"];

struct HabitsRow {
    student_id: String,
    age: i64,
    gender: &'static str,
    study_hours_per_day: f64,
    social_media_hours: f64,
    part_time_job: bool,
    attendance_percentage: f64,
    sleep_hours: f64,
    parental_education_level: &'static str,
    exam_score: f64,
}

fn habits_rows(rng: &mut SimpleRng, n: usize) -> Vec<HabitsRow> {
    (0..n)
        .map(|i| {
            let study = round1(rng.gauss(3.5, 1.4).clamp(0.0, 8.5));
            let social = round1(rng.gauss(2.5, 1.1).clamp(0.0, 7.0));
            let attendance = round1(rng.gauss(84.0, 9.0).clamp(56.0, 100.0));
            let sleep = round1(rng.gauss(6.5, 1.2).clamp(3.2, 10.0));
            let score = 22.0 + 9.5 * study - 2.5 * social + 0.12 * attendance + 1.8 * sleep
                + rng.gauss(0.0, 6.0);
            HabitsRow {
                student_id: format!("S{}", 1000 + i),
                age: 17 + (rng.next_u64() % 8) as i64,
                gender: rng.pick(&GENDERS),
                study_hours_per_day: study,
                social_media_hours: social,
                part_time_job: rng.next_f64() < 0.2,
                attendance_percentage: attendance,
                sleep_hours: sleep,
                parental_education_level: rng.pick(&HABITS_EDUCATION),
                exam_score: round1(score.clamp(18.0, 100.0)),
            }
        })
        .collect()
}

fn write_habits_csv(rows: &[HabitsRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "student_id",
        "age",
        "gender",
        "study_hours_per_day",
        "social_media_hours",
        "part_time_job",
        "attendance_percentage",
        "sleep_hours",
        "parental_education_level",
        "exam_score",
    ])?;
    for r in rows {
        writer.write_record([
            r.student_id.clone(),
            r.age.to_string(),
            r.gender.to_string(),
            r.study_hours_per_day.to_string(),
            r.social_media_hours.to_string(),
            if r.part_time_job { "Yes" } else { "No" }.to_string(),
            r.attendance_percentage.to_string(),
            r.sleep_hours.to_string(),
            r.parental_education_level.to_string(),
            r.exam_score.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_habits_parquet(rows: &[HabitsRow], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("student_id", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("study_hours_per_day", DataType::Float64, false),
        Field::new("social_media_hours", DataType::Float64, false),
        Field::new("part_time_job", DataType::Boolean, false),
        Field::new("attendance_percentage", DataType::Float64, false),
        Field::new("sleep_hours", DataType::Float64, false),
        Field::new("parental_education_level", DataType::Utf8, false),
        Field::new("exam_score", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.student_id.as_str()))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.age))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.gender))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.study_hours_per_day))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.social_media_hours))),
        Arc::new(BooleanArray::from(rows.iter().map(|r| r.part_time_job).collect::<Vec<_>>())),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.attendance_percentage))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.sleep_hours))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.parental_education_level))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.exam_score))),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn write_factors_csv(rng: &mut SimpleRng, n: usize, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Hours_Studied",
        "Attendance",
        "Parental_Involvement",
        "Sleep_Hours",
        "Previous_Scores",
        "Motivation_Level",
        "Parental_Education_Level",
        "Gender",
        "Exam_Score",
    ])?;
    for _ in 0..n {
        let hours = rng.gauss(20.0, 6.0).clamp(1.0, 44.0).round() as i64;
        let attendance = rng.gauss(80.0, 11.0).clamp(60.0, 100.0).round() as i64;
        let sleep = rng.gauss(7.0, 1.4).clamp(4.0, 10.0).round() as i64;
        let previous = rng.gauss(75.0, 14.0).clamp(50.0, 100.0).round() as i64;
        let score = 40.0 + 0.3 * hours as f64 + 0.2 * attendance as f64 + 0.05 * previous as f64
            + rng.gauss(0.0, 2.5);
        // Factors-style data leaves some education levels blank.
        let education = if rng.next_f64() < 0.02 {
            ""
        } else {
            rng.pick(&FACTORS_EDUCATION)
        };
        writer.write_record([
            hours.to_string(),
            attendance.to_string(),
            rng.pick(&LEVELS).to_string(),
            sleep.to_string(),
            previous.to_string(),
            rng.pick(&LEVELS).to_string(),
            education.to_string(),
            rng.pick(&GENDERS[..2]).to_string(),
            (score.clamp(55.0, 100.0).round() as i64).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let habits = habits_rows(&mut rng, 1000);
    write_habits_csv(&habits, &out_dir.join("student_habits_performance.csv"))?;
    write_habits_parquet(&habits, &out_dir.join("student_habits_performance.parquet"))?;
    write_factors_csv(&mut rng, 6607, &out_dir.join("StudentPerformanceFactors.csv"))?;

    log::info!("Wrote sample datasets to {}", out_dir.display());
    println!(
        "Wrote {} habits rows and 6607 factors rows to {}",
        habits.len(),
        out_dir.display()
    );
    Ok(())
}
