use serde::Serialize;

use super::steps::{
    AgeCheck, ChoiceOption, FieldRule, FieldSpec, StepDescriptor, StepTable, StepTableError,
};

pub const BASIC_INFO_FLOW: &str = "basic-info";
pub const QUESTIONNAIRE_FLOW: &str = "questionnaire";

pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const EMAIL: &str = "email";
pub const ACCEPT_MARKETING: &str = "accept_marketing";
pub const VERIFICATION_CODE: &str = "verification_code";
pub const DATE_OF_BIRTH: &str = "date_of_birth";
pub const LOCATION: &str = "location";
pub const GENDER: &str = "gender";

pub const VERIFICATION_CODE_LENGTH: usize = 4;
pub const MAX_MOTIVATIONS: usize = 2;

const fn opt(value: &'static str, label: &'static str) -> ChoiceOption {
    ChoiceOption::new(value, label)
}

fn name_step() -> StepDescriptor {
    StepDescriptor::free_text(
        "name",
        "What's your name?",
        vec![
            FieldSpec::new(FIRST_NAME, FieldRule::PersonName { required: true }),
            FieldSpec::new(LAST_NAME, FieldRule::PersonName { required: false }),
        ],
    )
    .with_hint("Last name is optional, and only shared with matches.")
}

fn basic_info_steps(age_check: AgeCheck) -> Vec<StepDescriptor> {
    vec![
        name_step(),
        StepDescriptor::composite_date(DATE_OF_BIRTH, "What's your date of birth?", age_check)
            .with_hint("We use this to calculate the age on your profile."),
        StepDescriptor::structured_location(LOCATION, "Where are you based?"),
        // Closing step shows a Continue affordance instead of auto-advancing.
        StepDescriptor::single_select(
            GENDER,
            "What gender describes you best?",
            vec![
                opt("man", "Man"),
                opt("woman", "Woman"),
                opt("non_binary", "Non-binary"),
            ],
        )
        .manual(),
    ]
}

/// Name, birth date (age gate), location, gender.
pub fn basic_info() -> Result<StepTable, StepTableError> {
    StepTable::new(BASIC_INFO_FLOW, basic_info_steps(AgeCheck::Gate))
}

/// Same flow, but the date step rejects underage dates itself and no gate opens.
pub fn basic_info_inline_age() -> Result<StepTable, StepTableError> {
    StepTable::new(BASIC_INFO_FLOW, basic_info_steps(AgeCheck::Inline))
}

/// Basic info with email entry and a 4-digit verification code after the name step.
pub fn basic_info_with_email_verification() -> Result<StepTable, StepTableError> {
    let mut steps = basic_info_steps(AgeCheck::Gate);
    steps.insert(
        1,
        StepDescriptor::free_text(
            "email",
            "What's your email?",
            vec![
                FieldSpec::new(EMAIL, FieldRule::Email),
                FieldSpec::new(ACCEPT_MARKETING, FieldRule::Flag),
            ],
        ),
    );
    steps.insert(
        2,
        StepDescriptor::free_text(
            "verify_email",
            "Enter the code we sent you",
            vec![FieldSpec::new(
                VERIFICATION_CODE,
                FieldRule::VerificationCode {
                    length: VERIFICATION_CODE_LENGTH,
                },
            )],
        ),
    );
    StepTable::new(BASIC_INFO_FLOW, steps)
}

/// The 17-question personality questionnaire.
pub fn questionnaire() -> Result<StepTable, StepTableError> {
    let steps = vec![
        StepDescriptor::multi_select(
            "motivations",
            "Why are you here? (choose up to 2)",
            vec![
                opt("make_friends", "Make new friends"),
                opt("experience_nature", "Experience nature together"),
                opt("escape_city", "Escape the city stress"),
                opt("inspiration_exchange", "Inspiration & exchange"),
                opt(
                    "sports_activities",
                    "Sports and activities with likeminded people",
                ),
            ],
            MAX_MOTIVATIONS,
        ),
        StepDescriptor::single_select(
            "preferred_group_size",
            "What group size feels right?",
            vec![
                opt("small_intimate", "Small & intimate (3–4 people)"),
                opt("medium_lively", "Slightly bigger & lively (5–6 people)"),
                opt("large_groups", "Big groups (7+ people)"),
            ],
        ),
        StepDescriptor::single_select(
            "connection_depth",
            "How deep do you want the connection to go?",
            vec![
                opt("light_easy", "Light & easy - see what happens"),
                opt("open_real", "Open conversations & real closeness"),
                opt("natural_mix", "A bit of both - as long as it feels natural"),
            ],
        ),
        StepDescriptor::single_select(
            "group_vibe",
            "When you're with a group of new people, what's your natural vibe?",
            vec![
                opt(
                    "bring_energy",
                    "I like to bring the energy and keep the group alive",
                ),
                opt(
                    "part_of_buzz",
                    "I enjoy being part of the buzz, but not always in the spotlight",
                ),
                opt(
                    "smaller_circles",
                    "I prefer to pick smaller circles or 1:1 conversations",
                ),
            ],
        ),
        StepDescriptor::single_select(
            "adventure_preference",
            "When it comes to adventures, what excites you more?",
            vec![
                opt("new_things", "Trying new things I have never done before"),
                opt("balance", "A good balance of new and familiar"),
                opt("know_and_love", "Sticking to what I know and love"),
            ],
        ),
        StepDescriptor::single_select(
            "experience_priority",
            "What matters most to you in shared experiences?",
            vec![
                opt("connections", "Building real connections & friendship"),
                opt("nature", "Experiencing nature & slowing down"),
                opt("fun_stories", "Having fun & creating stories to tell"),
                opt("learning_growing", "Learning new perspectives & growing"),
            ],
        ),
        StepDescriptor::single_select(
            "ideal_evening",
            "Your ideal evening after a day outdoors looks like…",
            vec![
                opt("laughs_jokes", "A lot of laughs, jokes, and easy vibes"),
                opt("deep_conversations", "Deep conversations on the couch"),
                opt("mix_mood", "A mix of both, depending on the mood"),
                opt(
                    "games_movies",
                    "Playing games or watching a movie with casual conversations",
                ),
            ],
        ),
        StepDescriptor::free_text(
            "talk_about_topic",
            "What topic could you talk about for hours?",
            vec![FieldSpec::new(
                "talk_about_topic",
                FieldRule::Text { max_chars: 150 },
            )],
        ),
        StepDescriptor::free_text(
            "must_pack_item",
            "Your \"must-pack\" item for any trip?",
            vec![FieldSpec::new(
                "must_pack_item",
                FieldRule::Text { max_chars: 100 },
            )],
        ),
        StepDescriptor::single_select(
            "storyteller_or_host",
            "Are you the one telling a story or making sure everyone has a drink?",
            vec![opt("storyteller", "Storyteller"), opt("host", "Host")],
        ),
        StepDescriptor::single_select(
            "social_recharge",
            "How do you recharge after social activities?",
            vec![
                opt("quiet_alone", "Quiet time alone with a book or music"),
                opt("one_on_one", "1:1 hangout with a close friend"),
                opt("workout_walk", "A workout, walk, or run"),
                opt(
                    "creative_downtime",
                    "Creative downtime (journaling, gaming, art)",
                ),
                opt(
                    "more_social",
                    "More social energy - I love keeping the momentum going",
                ),
            ],
        ),
        StepDescriptor::single_select(
            "wake_up_time",
            "My ideal day starts at...",
            vec![
                opt("5am", "5am"),
                opt("7am", "7am"),
                opt("9am", "9am"),
                opt("whenever", "Whenever I wake up"),
            ],
        ),
        StepDescriptor::single_select(
            "trip_planning",
            "I prefer trips that are...",
            vec![
                opt("highly_planned", "Highly planned"),
                opt("loosely_planned", "Loosely planned"),
                opt("spontaneous", "Completely spontaneous"),
            ],
        ),
        StepDescriptor::single_select(
            "activity_level",
            "My activity level is...",
            vec![
                opt("relaxed", "Relaxed"),
                opt("moderate", "Moderate"),
                opt("high_energy", "High-energy"),
            ],
        ),
        StepDescriptor::single_select(
            "bedtime",
            "I go to bed typically around...",
            vec![
                opt("9pm", "9pm"),
                opt("11pm", "11pm"),
                opt("1am", "1am"),
                opt("depends", "Depends on the day"),
            ],
        ),
        StepDescriptor::single_select(
            "cleanliness_matters",
            "Cleanliness matters to me...",
            vec![
                opt("not_much", "Not so much"),
                opt("somewhat", "Somewhat"),
                opt("a_lot", "A lot"),
            ],
        ),
        // Last question: selection enables "Complete Profile" rather than moving on.
        StepDescriptor::single_select(
            "drinks_smokes",
            "What's your vibe when it comes to drinks & smokes?",
            vec![
                opt(
                    "love_drink_smoke",
                    "Love a drink or cigarette with good conversation",
                ),
                opt(
                    "social_vibe",
                    "Happy to join the social vibe, but not really my thing",
                ),
                opt("prefer_free", "I prefer to keep it alcohol & smoke free"),
                opt("flexible", "Totally flexible - depends on the mood"),
            ],
        ),
    ];

    StepTable::new(QUESTIONNAIRE_FLOW, steps)
}

/// Both onboarding flows, built once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingFlows {
    pub basic_info: StepTable,
    pub questionnaire: StepTable,
}

impl OnboardingFlows {
    pub fn standard() -> Result<Self, StepTableError> {
        Ok(Self {
            basic_info: basic_info()?,
            questionnaire: questionnaire()?,
        })
    }

    pub fn by_name(&self, name: &str) -> Option<&StepTable> {
        match name {
            BASIC_INFO_FLOW => Some(&self.basic_info),
            QUESTIONNAIRE_FLOW => Some(&self.questionnaire),
            _ => None,
        }
    }
}
