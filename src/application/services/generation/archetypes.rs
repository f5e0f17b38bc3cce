//! Curated archetypes used to build deterministic fallbacks
//!
//! Every generator seeds a `StdRng` from the proposal seed and picks from these
//! tables, so the same seed always yields the same fallback content.

use rand::rngs::StdRng;
use rand::Rng;

use crate::domain::entities::{QuestType, Rarity};

pub struct CharacterArchetype {
    pub key: &'static str,
    pub names: &'static [&'static str],
    pub description: &'static str,
    pub health: i64,
    pub attack: i64,
    pub defense: i64,
    pub currency_drop: i64,
    pub hostile: bool,
}

pub const CHARACTER_ARCHETYPES: &[CharacterArchetype] = &[
    CharacterArchetype {
        key: "bandit",
        names: &["Rusk the Quick", "Mara Cutpurse", "Old Tobin", "Vessa Nightrun"],
        description: "A road bandit who knows every ditch and hedge along the trade routes.",
        health: 60,
        attack: 12,
        defense: 6,
        currency_drop: 25,
        hostile: true,
    },
    CharacterArchetype {
        key: "beast",
        names: &["Ashmaw", "Greyhide", "The Marsh Howler", "Thornback"],
        description: "A territorial beast grown bold from the absence of hunters.",
        health: 90,
        attack: 15,
        defense: 8,
        currency_drop: 5,
        hostile: true,
    },
    CharacterArchetype {
        key: "warlord",
        names: &["Grimjaw", "Hask Ironbrow", "Queen Ulla", "Varn the Unbowed"],
        description: "A warlord whose banner gathers every blade for leagues around.",
        health: 240,
        attack: 30,
        defense: 20,
        currency_drop: 120,
        hostile: true,
    },
    CharacterArchetype {
        key: "merchant",
        names: &["Pell Farwander", "Ysolde Brightcoin", "Dunmore", "Auntie Reed"],
        description: "A traveling merchant with a cart of curiosities and a long memory for debts.",
        health: 40,
        attack: 3,
        defense: 4,
        currency_drop: 60,
        hostile: false,
    },
    CharacterArchetype {
        key: "courier",
        names: &["Tamsin Swiftfoot", "Brannock", "Little Fen", "Oswin Post"],
        description: "A courier who has never yet lost a parcel and does not mean to start now.",
        health: 45,
        attack: 5,
        defense: 5,
        currency_drop: 10,
        hostile: false,
    },
    CharacterArchetype {
        key: "sage",
        names: &["Mother Ilse", "Corwin Ashdown", "The Hermit of Vell", "Sister Mae"],
        description: "A sage who trades in rumors of buried things and forgotten roads.",
        health: 35,
        attack: 2,
        defense: 3,
        currency_drop: 15,
        hostile: false,
    },
];

pub struct ItemArchetype {
    pub key: &'static str,
    pub item_type: &'static str,
    pub names: &'static [&'static str],
    pub description: &'static str,
    pub damage: i64,
    pub defense: i64,
    pub value: i64,
}

pub const ITEM_ARCHETYPES: &[ItemArchetype] = &[
    ItemArchetype {
        key: "blade",
        item_type: "weapon",
        names: &["Notched Sabre", "Ember Edge", "Widow's Fang", "Pilgrim Sword"],
        description: "A blade balanced for quick cuts, its grip worn smooth by an earlier owner.",
        damage: 12,
        defense: 0,
        value: 80,
    },
    ItemArchetype {
        key: "bow",
        item_type: "weapon",
        names: &["Ashwood Longbow", "Hunter's Recurve", "Stormstring", "Sparrow Bow"],
        description: "A bow of seasoned wood, strung tight and ready.",
        damage: 10,
        defense: 0,
        value: 70,
    },
    ItemArchetype {
        key: "armor",
        item_type: "armor",
        names: &["Scaled Hauberk", "Warden's Coat", "Riveted Jerkin", "Bastion Plate"],
        description: "Armor patched many times over and trusted all the more for it.",
        damage: 0,
        defense: 10,
        value: 90,
    },
    ItemArchetype {
        key: "charm",
        item_type: "trinket",
        names: &["Lucky Knucklebone", "Moonstone Charm", "Saint's Token", "Glass Eye"],
        description: "A small charm said to turn aside misfortune.",
        damage: 0,
        defense: 2,
        value: 45,
    },
    ItemArchetype {
        key: "parcel",
        item_type: "quest",
        names: &["Sealed Parcel", "Wax-Stamped Letter", "Iron-Bound Box", "Silk Bundle"],
        description: "A package that must arrive unopened.",
        damage: 0,
        defense: 0,
        value: 20,
    },
    ItemArchetype {
        key: "treasure",
        item_type: "treasure",
        names: &["Gilded Reliquary", "Drowned Crown", "Chest of Old Coin", "Star Map"],
        description: "Treasure long hidden from anyone who did not know where to dig.",
        damage: 0,
        defense: 0,
        value: 150,
    },
];

pub struct QuestTemplate {
    pub quest_type: QuestType,
    pub names: &'static [&'static str],
    /// `{target}` is replaced with the quest target
    pub objective: &'static str,
    pub default_target: &'static str,
    pub base_reward: i64,
}

pub const QUEST_TEMPLATES: &[QuestTemplate] = &[
    QuestTemplate {
        quest_type: QuestType::Fetch,
        names: &["A Missing Heirloom", "The Borrowed Lantern", "Roots and Remedies"],
        objective: "Find {target} and bring it back.",
        default_target: "the lost heirloom",
        base_reward: 40,
    },
    QuestTemplate {
        quest_type: QuestType::Delivery,
        names: &["Urgent Post", "A Parcel for the Pass", "Before the Bells"],
        objective: "Deliver {target} before time runs out.",
        default_target: "the sealed parcel",
        base_reward: 60,
    },
    QuestTemplate {
        quest_type: QuestType::Collection,
        names: &["Buried Fortune", "Marks on the Map", "What the Tide Left"],
        objective: "Recover {target} from its hiding place.",
        default_target: "the hidden cache",
        base_reward: 80,
    },
    QuestTemplate {
        quest_type: QuestType::Slay,
        names: &["Teeth in the Dark", "Bounty Posted", "Clear the Road"],
        objective: "Defeat {target}.",
        default_target: "the beast troubling the road",
        base_reward: 100,
    },
    QuestTemplate {
        quest_type: QuestType::Explore,
        names: &["Beyond the Last Milestone", "Edges of the Map", "The Silent Valley"],
        objective: "Scout {target} and report what you find.",
        default_target: "the unmapped hills",
        base_reward: 50,
    },
];

pub struct Biome {
    pub key: &'static str,
    pub adjectives: &'static [&'static str],
    pub nouns: &'static [&'static str],
    pub description: &'static str,
}

pub const BIOMES: &[Biome] = &[
    Biome {
        key: "forest",
        adjectives: &["Whispering", "Old", "Tangled", "Mossy"],
        nouns: &["Wood", "Glade", "Thicket", "Hollow"],
        description: "Trees close overhead and the undergrowth hides more than deer.",
    },
    Biome {
        key: "plains",
        adjectives: &["Windswept", "Golden", "Open", "Barrow"],
        nouns: &["Fields", "Downs", "Steppe", "Meadow"],
        description: "Grass runs to the horizon, broken only by cairns and the odd lonely tree.",
    },
    Biome {
        key: "marsh",
        adjectives: &["Sunken", "Reeking", "Grey", "Drowned"],
        nouns: &["Fen", "Mire", "Bog", "Sloughs"],
        description: "Black water pools between tussocks and the mist rarely lifts.",
    },
    Biome {
        key: "hills",
        adjectives: &["Broken", "Red", "Shepherd's", "Crooked"],
        nouns: &["Hills", "Tors", "Ridge", "Heights"],
        description: "Rolling hills of scree and heather, cut by sheep tracks.",
    },
    Biome {
        key: "ruins",
        adjectives: &["Fallen", "Forgotten", "Ashen", "Silent"],
        nouns: &["Keep", "Ruins", "Cloister", "Watchtower"],
        description: "Crumbled stonework of a place whose name nobody remembers.",
    },
];

/// Uniform pick from a non-empty table
pub fn pick<'a, T>(rng: &mut StdRng, table: &'a [T]) -> &'a T {
    &table[rng.gen_range(0..table.len())]
}

pub fn character_archetype(key: &str) -> Option<&'static CharacterArchetype> {
    CHARACTER_ARCHETYPES
        .iter()
        .find(|a| a.key.eq_ignore_ascii_case(key))
}

pub fn item_archetype(key: &str) -> Option<&'static ItemArchetype> {
    ITEM_ARCHETYPES.iter().find(|a| a.key.eq_ignore_ascii_case(key))
}

pub fn quest_template(quest_type: QuestType) -> &'static QuestTemplate {
    QUEST_TEMPLATES
        .iter()
        .find(|t| t.quest_type == quest_type)
        .unwrap_or(&QUEST_TEMPLATES[0])
}

/// Rarity roll weighted towards common
pub fn roll_rarity(rng: &mut StdRng) -> Rarity {
    match rng.gen_range(0..100) {
        0..=54 => Rarity::Common,
        55..=79 => Rarity::Uncommon,
        80..=93 => Rarity::Rare,
        94..=98 => Rarity::Epic,
        _ => Rarity::Legendary,
    }
}
