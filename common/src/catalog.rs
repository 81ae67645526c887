//! Seed catalog: the challenge and achievement definitions every deployment
//! starts with.

use sqlx::types::Json;

use crate::{
    models::{Achievement, Challenge},
    utils::{AchievementCategory, Category, Difficulty},
};

struct ChallengeDef {
    title: &'static str,
    description: &'static str,
    category: Category,
    difficulty: Difficulty,
    points: i32,
    estimated_time: i32,
    question: &'static str,
    content: &'static str,
    hint: &'static str,
    answer: &'static str,
    options: &'static [&'static str],
}

const CHALLENGES: &[ChallengeDef] = &[
    ChallengeDef {
        title: "Word Association Puzzle",
        description: "Find the word that connects these three words",
        category: Category::Puzzle,
        difficulty: Difficulty::Medium,
        points: 100,
        estimated_time: 5,
        question: "Find the word that connects these three words",
        content: "TENNIS • NOISE • RACKET",
        hint: "Think about sports equipment",
        answer: "racket",
        options: &[],
    },
    ChallengeDef {
        title: "Classic Riddle",
        description: "Solve this classic riddle that tests your lateral thinking",
        category: Category::Riddle,
        difficulty: Difficulty::Easy,
        points: 75,
        estimated_time: 3,
        question: "What can you catch but not throw?",
        content: "Think about things that can be 'caught' but not physically thrown.",
        hint: "It's something that happens to you, not an object",
        answer: "cold",
        options: &[],
    },
    ChallengeDef {
        title: "Number Sequence",
        description: "Find the next number in this logical sequence",
        category: Category::Logic,
        difficulty: Difficulty::Hard,
        points: 150,
        estimated_time: 8,
        question: "What is the next number in this sequence?",
        content: "2, 3, 5, 9, 17, ?",
        hint: "The relationship between consecutive numbers follows a pattern",
        answer: "33",
        options: &[],
    },
    ChallengeDef {
        title: "Memory Challenge",
        description: "Memorize and recall a sequence of symbols",
        category: Category::Memory,
        difficulty: Difficulty::Medium,
        points: 125,
        estimated_time: 5,
        question: "What was the middle symbol in the second row?",
        content: "🌟, 🔥, 🌈, 🍎, 🌊, 💎, 🚀, 🎮, 🎸",
        hint: "Try creating a story with the symbols to help remember them",
        answer: "🌊",
        options: &[],
    },
    ChallengeDef {
        title: "Word Ladder",
        description: "Transform one word into another by changing one letter at a time",
        category: Category::Puzzle,
        difficulty: Difficulty::Hard,
        points: 175,
        estimated_time: 10,
        question: "Transform COLD into WARM using only valid words, changing one letter at a time",
        content: "Example: CAT → COT → DOT → DOG (changing one letter at each step)",
        hint: "There are multiple possible paths",
        answer: "cold cord word warm",
        options: &[],
    },
    ChallengeDef {
        title: "Logic Grid Puzzle",
        description: "Use the clues to fill in a logic grid and solve the mystery",
        category: Category::Logic,
        difficulty: Difficulty::Hard,
        points: 200,
        estimated_time: 15,
        question: "Based on the given information, who owns the zebra?",
        content: "Five people of different nationalities live in five consecutive houses of \
                  different colors. The Englishman lives in the red house. The Spaniard owns a \
                  dog. Coffee is drunk in the green house. The Ukrainian drinks tea. The green \
                  house is immediately to the right of the ivory house. The Old Gold smoker owns \
                  snails. Kools are smoked in the yellow house. Milk is drunk in the middle \
                  house. The Norwegian lives in the first house. The man who smokes \
                  Chesterfields lives in the house next to the man with the fox. Kools are \
                  smoked in the house next to the house where the horse is kept. The Lucky \
                  Strike smoker drinks orange juice. The Japanese smokes Parliaments. The \
                  Norwegian lives next to the blue house.",
        hint: "Start by placing the Norwegian in house #1, and work through the clues methodically",
        answer: "Japanese",
        options: &["Norwegian", "Ukrainian", "Englishman", "Japanese", "Spaniard"],
    },
    ChallengeDef {
        title: "Visual Pattern Recognition",
        description: "Identify the pattern and select the missing element",
        category: Category::Puzzle,
        difficulty: Difficulty::Medium,
        points: 125,
        estimated_time: 6,
        question: "Which figure completes the pattern?",
        content: "A set of shapes is arranged in a 3x3 grid, with each row and column following \
                  specific rules of rotation and transformation. The bottom right shape is \
                  missing.",
        hint: "Look at how shapes transform across rows and columns",
        answer: "Triangle pointing up",
        options: &[
            "Circle with two dots",
            "Square with diagonal line",
            "Triangle pointing up",
            "Pentagon with dot in center",
        ],
    },
    ChallengeDef {
        title: "Famous Brain Teaser",
        description: "Solve this classic brain teaser that has stumped many",
        category: Category::Riddle,
        difficulty: Difficulty::Hard,
        points: 150,
        estimated_time: 8,
        question: "A man is looking at a photograph and says, 'Brothers and sisters I have none, \
                   but this man's father is my father's son.' Who is in the photograph?",
        content: "Think about family relationships carefully.",
        hint: "Draw out the family tree to visualize the relationship",
        answer: "his son",
        options: &[],
    },
];

// (code, name, description, icon, category, points)
const ACHIEVEMENTS: &[(&str, &str, &str, &str, AchievementCategory, i32)] = &[
    ("first_steps", "First Steps", "Complete your first challenge", "trophy", AchievementCategory::Progress, 10),
    ("brain_starter", "Brain Starter", "Complete 5 challenges", "brain", AchievementCategory::Progress, 25),
    ("mind_master", "Mind Master", "Complete 25 challenges", "award", AchievementCategory::Progress, 100),
    ("streak_beginner", "Streak Beginner", "Maintain a 3-day streak", "flame", AchievementCategory::Streak, 15),
    ("streak_enthusiast", "Streak Enthusiast", "Maintain a 7-day streak", "flame", AchievementCategory::Streak, 50),
    ("streak_master", "Streak Master", "Maintain a 30-day streak", "flame", AchievementCategory::Streak, 200),
    ("logic_novice", "Logic Novice", "Complete 3 logic challenges", "puzzle", AchievementCategory::Category, 20),
    ("memory_whiz", "Memory Whiz", "Complete 3 memory challenges", "brain", AchievementCategory::Category, 20),
    ("riddle_solver", "Riddle Solver", "Complete 3 riddle challenges", "lightbulb", AchievementCategory::Category, 20),
    ("puzzle_master", "Puzzle Master", "Complete 3 puzzle challenges", "puzzle-piece", AchievementCategory::Category, 20),
];

/// Seed challenges with ids assigned from 1 in catalog order.
pub fn seed_challenges() -> Vec<Challenge> {
    CHALLENGES
        .iter()
        .zip(1..)
        .map(|(def, id)| Challenge {
            id,
            title: def.title.to_string(),
            description: def.description.to_string(),
            category: def.category,
            challenge_type: def.category,
            difficulty: def.difficulty,
            points: def.points,
            estimated_time: def.estimated_time,
            question: def.question.to_string(),
            content: Some(def.content.to_string()),
            hint: Some(def.hint.to_string()),
            answer: def.answer.to_string(),
            options: (!def.options.is_empty())
                .then(|| Json(def.options.iter().map(|o| o.to_string()).collect())),
            is_daily: false,
            daily_date: None,
        })
        .collect()
}

/// Seed achievements with ids assigned from 1 in catalog order.
pub fn seed_achievements() -> Vec<Achievement> {
    ACHIEVEMENTS
        .iter()
        .zip(1..)
        .map(
            |(&(code, name, description, icon, category, points), id)| Achievement {
                id,
                code: code.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                icon: icon.to_string(),
                category,
                points,
            },
        )
        .collect()
}
