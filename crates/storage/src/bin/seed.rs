use clap::Parser;
use lingo_core::model::{
    Challenge, ChallengeId, ChallengeKind, ChallengeOption, Course, CourseId, Lesson, LessonId,
    OptionId, Unit, UnitId,
};
use storage::repository::{Storage, StorageError};

/// Seed a database with the XRP course catalogue.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// Database URL.
    #[arg(long = "db", env = "LINGO_DB_URL", default_value = "sqlite:lingo.sqlite3")]
    db_url: String,
}

const COURSES: &[(u64, &str, &str)] = &[
    (1, "XRP Basics", "/es.svg"),
    (2, "XRP Advanced", "/it.svg"),
    (3, "XRP DeFi", "/fr.svg"),
    (4, "XRP Development", "/hr.svg"),
];

/// `(id, course, title, description, order)`
const UNITS: &[(u64, u64, &str, &str, u32)] = &[
    (1, 1, "Unit 1", "XRP Fundamentals", 1),
    (2, 1, "Unit 2", "XRP Technology", 2),
    (3, 2, "Unit 1", "Advanced Concepts", 1),
    (4, 2, "Unit 2", "Advanced Features", 2),
    (5, 3, "Unit 1", "DeFi Basics", 1),
    (6, 4, "Unit 1", "Development Basics", 1),
];

/// `(id, unit, title, order)`
const LESSONS: &[(u64, u64, &str, u32)] = &[
    (1, 1, "XRP Introduction", 1),
    (2, 1, "Wallet & Transactions", 2),
    (3, 1, "Network & Consensus", 3),
    (4, 2, "Smart Contracts", 1),
    (5, 2, "DeFi Applications", 2),
    (6, 3, "Advanced Features", 1),
    (7, 4, "Payment Channels", 1),
    (8, 5, "AMM & Liquidity", 1),
    (9, 6, "XRPL SDK", 1),
];

struct SeedChallenge {
    id: u64,
    lesson: u64,
    order: u32,
    question: &'static str,
    /// `(text, image, correct)`
    options: [(&'static str, &'static str, bool); 3],
}

const CHALLENGES: &[SeedChallenge] = &[
    SeedChallenge {
        id: 1,
        lesson: 1,
        order: 1,
        question: "Who created XRP?",
        options: [
            ("Satoshi Nakamoto", "/woman.svg", false),
            ("Ripple Labs", "/man.svg", true),
            ("Vitalik Buterin", "/robot.svg", false),
        ],
    },
    SeedChallenge {
        id: 2,
        lesson: 1,
        order: 2,
        question: "When was XRP launched?",
        options: [
            ("2015", "/robot.svg", false),
            ("2012", "/man.svg", true),
            ("2017", "/woman.svg", false),
        ],
    },
    SeedChallenge {
        id: 3,
        lesson: 1,
        order: 3,
        question: "What is the main purpose of XRP?",
        options: [
            ("Smart contracts platform", "/robot.svg", false),
            ("Cross-border payments", "/woman.svg", true),
            ("Digital gold", "/man.svg", false),
        ],
    },
    SeedChallenge {
        id: 4,
        lesson: 2,
        order: 1,
        question: "What is the minimum XRP required for a wallet?",
        options: [
            ("20 XRP", "/robot.svg", false),
            ("10 XRP", "/woman.svg", true),
            ("50 XRP", "/man.svg", false),
        ],
    },
    SeedChallenge {
        id: 5,
        lesson: 2,
        order: 2,
        question: "What is the average XRP transaction time?",
        options: [
            ("3-5 seconds", "/woman.svg", true),
            ("1 minute", "/man.svg", false),
            ("10 minutes", "/robot.svg", false),
        ],
    },
    SeedChallenge {
        id: 6,
        lesson: 2,
        order: 3,
        question: "What happens to XRP transaction fees?",
        options: [
            ("Given to validators", "/robot.svg", false),
            ("Burned forever", "/woman.svg", true),
            ("Returned to Ripple", "/man.svg", false),
        ],
    },
    SeedChallenge {
        id: 7,
        lesson: 3,
        order: 1,
        question: "What consensus mechanism does XRP use?",
        options: [
            ("RPCA (Ripple Protocol Consensus Algorithm)", "/woman.svg", true),
            ("Proof of Work", "/man.svg", false),
            ("Proof of Stake", "/robot.svg", false),
        ],
    },
    SeedChallenge {
        id: 8,
        lesson: 3,
        order: 2,
        question: "How many validators are needed for consensus?",
        options: [
            ("51% of all validators", "/robot.svg", false),
            ("80% of trusted validators", "/woman.svg", true),
            ("All validators must agree", "/man.svg", false),
        ],
    },
    SeedChallenge {
        id: 9,
        lesson: 3,
        order: 3,
        question: "What is the XRP Ledger consensus interval?",
        options: [
            ("10 seconds", "/man.svg", false),
            ("3-5 seconds", "/woman.svg", true),
            ("1 minute", "/robot.svg", false),
        ],
    },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::sqlite(&args.db_url).await?;
    seed(&storage).await?;
    println!(
        "seeded {} courses, {} lessons and {} challenges into {}",
        COURSES.len(),
        LESSONS.len(),
        CHALLENGES.len(),
        args.db_url
    );
    Ok(())
}

async fn seed(storage: &Storage) -> Result<(), Box<dyn std::error::Error>> {
    for &(id, title, image) in COURSES {
        storage
            .courses
            .upsert_course(&Course {
                id: CourseId::new(id),
                title: title.into(),
                image_src: image.into(),
            })
            .await?;
    }

    for &(id, course, title, description, order) in UNITS {
        storage
            .courses
            .upsert_unit(&Unit {
                id: UnitId::new(id),
                course_id: CourseId::new(course),
                title: title.into(),
                description: description.into(),
                order,
            })
            .await?;
    }

    for &(id, unit, title, order) in LESSONS {
        storage
            .courses
            .upsert_lesson(&Lesson {
                id: LessonId::new(id),
                unit_id: UnitId::new(unit),
                title: title.into(),
                order,
            })
            .await?;
    }

    for seed in CHALLENGES {
        let challenge_id = ChallengeId::new(seed.id);
        let options = seed
            .options
            .iter()
            .zip(1_u64..)
            .map(|(&(text, image, correct), n)| {
                ChallengeOption::new(OptionId::new(seed.id * 10 + n), challenge_id, text, correct)
                    .with_image(image)
            })
            .collect();
        let challenge = Challenge::new(
            challenge_id,
            LessonId::new(seed.lesson),
            ChallengeKind::Select,
            seed.question,
            seed.order,
            options,
        )?;
        storage
            .courses
            .upsert_challenge(&challenge)
            .await
            .map_err(|e: StorageError| format!("challenge {}: {e}", seed.id))?;
    }

    Ok(())
}
