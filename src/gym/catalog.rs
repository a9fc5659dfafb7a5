//! Read-only exercise catalog.

use serde::Serialize;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExerciseLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for ExerciseLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("unknown exercise level: {other}")),
        }
    }
}

impl fmt::Display for ExerciseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: String,
    pub level: ExerciseLevel,
}

impl Exercise {
    #[must_use]
    pub fn new(id: &str, name: &str, description: &str, level: ExerciseLevel) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            level,
        }
    }
}

/// Exercises members can complete, keyed by slug.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    #[must_use]
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    /// The gym's standard program: ten exercises per level.
    #[must_use]
    pub fn standard() -> Self {
        let exercises = STANDARD
            .iter()
            .map(|(id, name, description, level)| Exercise::new(id, name, description, *level))
            .collect();
        Self { exercises }
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|exercise| exercise.id == id)
    }

    #[must_use]
    pub fn by_level(&self, level: ExerciseLevel) -> Vec<Exercise> {
        self.exercises
            .iter()
            .filter(|exercise| exercise.level == level)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

use ExerciseLevel::{Advanced, Beginner, Intermediate};

const STANDARD: &[(&str, &str, &str, ExerciseLevel)] = &[
    ("push-ups", "Push-ups", "Classic upper body exercise. 3 sets of 10 reps", Beginner),
    ("bodyweight-squats", "Bodyweight Squats", "Lower body strength. 3 sets of 15 reps", Beginner),
    ("plank", "Plank", "Core stability. Hold for 30 seconds, 3 sets", Beginner),
    ("lunges", "Lunges", "Leg strength and balance. 3 sets of 10 per leg", Beginner),
    ("wall-sit", "Wall Sit", "Quad endurance. Hold for 30 seconds, 3 sets", Beginner),
    ("modified-burpees", "Modified Burpees", "Full body cardio without the jump. 3 sets of 8", Beginner),
    ("knee-push-ups", "Knee Push-ups", "Easier push-up variation. 3 sets of 12", Beginner),
    ("glute-bridges", "Glute Bridges", "Glute and hamstring activation. 3 sets of 15", Beginner),
    ("mountain-climbers", "Mountain Climbers", "Cardio and core. 3 sets of 20 seconds", Beginner),
    ("tricep-dips", "Tricep Dips", "Arm strength using a chair. 3 sets of 10", Beginner),
    ("pull-ups", "Pull-ups", "Back and bicep strength. 3 sets of 8 reps", Intermediate),
    ("dumbbell-bench-press", "Dumbbell Bench Press", "Chest strength. 4 sets of 10 reps", Intermediate),
    ("barbell-rows", "Barbell Rows", "Back thickness. 4 sets of 10 reps", Intermediate),
    ("overhead-press", "Overhead Press", "Shoulder strength. 4 sets of 8 reps", Intermediate),
    ("deadlifts", "Deadlifts", "Posterior chain. 4 sets of 8 reps", Intermediate),
    ("weighted-squats", "Weighted Squats", "Leg strength with load. 4 sets of 10 reps", Intermediate),
    ("dips", "Dips", "Chest and triceps. 3 sets of 12 reps", Intermediate),
    ("russian-twists", "Russian Twists", "Oblique work. 3 sets of 20 reps", Intermediate),
    ("box-jumps", "Box Jumps", "Explosive power. 4 sets of 8 reps", Intermediate),
    ("pike-push-ups", "Pike Push-ups", "Shoulder-focused push-up. 3 sets of 10", Intermediate),
    ("muscle-ups", "Muscle-ups", "Advanced pull and push. 3 sets of 5 reps", Advanced),
    ("pistol-squats", "Pistol Squats", "Single-leg strength. 3 sets of 6 per leg", Advanced),
    ("handstand-push-ups", "Handstand Push-ups", "Vertical pressing strength. 3 sets of 6", Advanced),
    ("heavy-deadlifts", "Heavy Deadlifts", "Maximal posterior chain. 5 sets of 5 reps", Advanced),
    ("weighted-pull-ups", "Weighted Pull-ups", "Loaded back strength. 4 sets of 6 reps", Advanced),
    ("front-squats", "Front Squats", "Quad and core strength. 5 sets of 5 reps", Advanced),
    ("turkish-get-ups", "Turkish Get-ups", "Full body stability. 3 sets of 3 per side", Advanced),
    ("archer-push-ups", "Archer Push-ups", "Unilateral chest strength. 3 sets of 6 per side", Advanced),
    ("dragon-flags", "Dragon Flags", "Extreme core control. 3 sets of 5 reps", Advanced),
    ("one-arm-rows", "One-Arm Rows", "Unilateral back strength. 4 sets of 8 per arm", Advanced),
];
