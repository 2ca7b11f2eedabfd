//! Fixed upper levels of the HS taxonomy: 15 sections and their chapters.
//!
//! Sections here are a 15-way grouping of the 21 official HS sections
//! (food, textiles, and the like are merged). Every chapter carries its
//! official 2-digit code. Chapter 77 is reserved and never appears.
//!
//! Lookups never fail: an unknown section yields no chapters and an unknown
//! chapter label maps to the placeholder code [`UNKNOWN_CHAPTER`].

/// Code returned by [`code_to_two_digit`] for labels outside the table.
pub const UNKNOWN_CHAPTER: &str = "00";

static SECTIONS: [&str; 15] = [
    "Live animals, animal products",
    "Vegetable products",
    "Animals or vegetable fats and oils, prepared foodstuffs",
    "Mineral products",
    "Products of the chemical or allied industries",
    "Plastics and articles thereof, and rubber and articles thereof",
    "Raw hides and skins, leather, furskins and articles thereof",
    "Wood and articles of wood, pulp of wood",
    "Textile and textile articles",
    "Footwear, hats, wigs, articles made of stone, ceramics",
    "Base metals and articles thereof",
    "Machineries, electrical machinery and equipment and parts thereof, sound recorders and reproducers, television and parts thereof",
    "Vehicles, aircraft, vessels and associated transport equipment",
    "Optical, photographic instruments and apparatus, watches, musical instruments",
    "Arms and ammunition, miscellaneous manufactured articles, works of art",
];

/// `(code, label)` per chapter, grouped by section in [`SECTIONS`] order.
static CHAPTERS: [&[(&str, &str)]; 15] = [
    &[
        ("01", "Live Animals"),
        ("02", "Meat and edible meat offal"),
        ("03", "Fish and crustaceans, molluscs and other aquatic invertebrates"),
        (
            "04",
            "Dairy produce; birds' eggs; natural honey; edible products of animal origin, not elsewhere specified or included",
        ),
        ("05", "Products of animal origin, not elsewhere specified or included"),
    ],
    &[
        (
            "06",
            "Live trees and other plants; bulbs, roots and the like; cut flowers and ornamental foliage",
        ),
        ("07", "Edible vegetables and certain roots and tubers"),
        ("08", "Edible fruit and nuts; peel of citrus fruits or melons"),
        ("09", "Coffee, tea, mate and spices"),
        ("10", "Cereals"),
        ("11", "Products of the milling industry; malt; starches; inulin; wheat gluten"),
        (
            "12",
            "Oil seeds and oleaginous fruits; miscellaneous grains, seeds and fruit; industrial or medicinal plants; straw and fodder",
        ),
        ("13", "Lac; gums, resins and other vegetable saps and extracts"),
        (
            "14",
            "Vegetable plaiting materials; vegetable products not elsewhere specified or included",
        ),
    ],
    &[
        (
            "15",
            "Animal or vegetable fats and oil and their cleavage products; prepared edible fats; animal or vegetable waxes",
        ),
        (
            "16",
            "Preparations of meat, of fish or of crustaceans, molluscs or other aquatic invertebrates",
        ),
        ("17", "Sugars and sugar confectionery"),
        ("18", "Cocoa and cocoa preparations"),
        ("19", "Preparations of cereals, flour, starch or milk; pastry cooks' products"),
        ("20", "Preparations of vegetables, fruit, nuts or other parts of plants"),
        ("21", "Miscellaneous edible preparations"),
        ("22", "Beverages, spirits and vinegar"),
        ("23", "Residues and waste from the food industries; prepared animal fodder"),
        ("24", "Tobacco and manufactured tobacco substitutes"),
    ],
    &[
        ("25", "Salt; sulphur, earths and stones; plastering materials, lime and cement"),
        ("26", "Ores, slag and ash"),
        (
            "27",
            "Mineral fuels, mineral oils and products of their distillation; bituminous substances; mineral waxes",
        ),
    ],
    &[
        (
            "28",
            "Inorganic chemicals; organic or inorganic compounds of precious metals, of rare-earth metals, of radioactive elements or of isotopes",
        ),
        ("29", "Organic chemicals"),
        ("30", "Pharmaceutical products"),
        ("31", "Fertilizers"),
        (
            "32",
            "Tanning or dyeing extracts; tannins and their derivatives; dyes, pigments and other colouring matter, paints and varnishes; putty and other mastics; inks",
        ),
        ("33", "Essential oils and resinoids; perfumery, cosmetic or toilet preparations"),
        (
            "34",
            "Soap, organic surface-active agents, washing preparations, lubricating preparations, artificial waxes, prepared waxes, polishing or scouring preparations, candles and similar articles, modelling pastes, 'dental waxes' and dental preparations with a basis",
        ),
        ("35", "Albuminoidal substances; modified starches; glues; enzymes"),
        (
            "36",
            "Explosives; pyrotechnic products; matches; pyrophoric alloys; certain combustible preparations",
        ),
        ("37", "Photographic or cinematographic goods"),
        ("38", "Miscellaneous chemical products"),
    ],
    &[
        ("39", "Plastics and articles thereof"),
        ("40", "Rubber and articles thereof"),
    ],
    &[
        ("41", "Raw hides and skins (other than furskins) and leather"),
        (
            "42",
            "Articles of leather; saddlery and harness; travel goods, handbags and similar containers; articles of animal gut (other than silk-worm gut)",
        ),
        ("43", "Furskins and artificial fur, manufactures thereof"),
    ],
    &[
        ("44", "Wood and Articles of wood; wood charcoal"),
        ("45", "Cork and articles of cork"),
        (
            "46",
            "Manufactures of straw, of esparto or of other plaiting materials; basket-ware and wickerwork",
        ),
        (
            "47",
            "Pulp of wood or of other fibrous cellulosic material; recovered (waste and scrap) paper or paperboard",
        ),
        ("48", "Paper and paperboard; articles of paper pulp, of paper or of paperboard"),
        (
            "49",
            "Printed books, newspapers, pictures and other products of the printing industry; manuscripts, typescripts and plans",
        ),
    ],
    &[
        ("50", "Silk"),
        ("51", "Wool, fine or coarse animal hair; horse hair yarn and woven fabric"),
        ("52", "Cotton"),
        ("53", "Other vegetable textile fibres; paper yarn and woven fabrics of paper yarn"),
        ("54", "Man-made filaments"),
        ("55", "Man-made staple fibres"),
        (
            "56",
            "Wadding, felt and non-wovens; special yarns; twine, cordage, ropes and cables and articles thereof",
        ),
        ("57", "Carpets and other textile floor coverings"),
        (
            "58",
            "Special woven fabrics; tufted textile fabrics; lace; tapestries; trimmings; embroidery",
        ),
        (
            "59",
            "Impregnated, coated, covered or laminated textile fabrics; textile articles of a kind suitable for industrial use",
        ),
        ("60", "Knitted or crocheted fabrics"),
        ("61", "Articles of apparel and clothing accessories knitted or crocheted"),
        ("62", "Articles of apparel and clothing accessories, not knitted or crocheted"),
        (
            "63",
            "Other made up textile articles; sets; worn clothing and worn textile articles; rags",
        ),
    ],
    &[
        ("64", "Footwear, gaiters and the like; parts of such articles"),
        ("65", "Headgear and parts thereof"),
        (
            "66",
            "Umbrellas, sun umbrellas, walking-sticks, seat-sticks, whips, riding-crops and parts thereof",
        ),
        (
            "67",
            "Prepared feathers and down and articles made of feathers or of down; artificial flowers; articles of human hair",
        ),
        ("68", "Articles of stone, plaster, cement, asbestos, mica or similar materials"),
        ("69", "Ceramic products"),
        ("70", "Glass and glassware"),
        (
            "71",
            "Natural or cultured pearls, precious or semi-precious stones, precious metals, metals clad with precious metal and articles thereof; immitation jewellery; coin",
        ),
    ],
    &[
        ("72", "Iron and steel"),
        ("73", "Articles of iron or steel"),
        ("74", "Copper and articles thereof"),
        ("75", "Nickel and articles thereof"),
        ("76", "Aluminium and articles thereof"),
        ("78", "Lead and articles thereof"),
        ("79", "Zinc and articles thereof"),
        ("80", "Tin and articles thereof"),
        ("81", "Other base metals; cermets; articles thereof"),
        (
            "82",
            "Tools, implements, cutlery, spoons and forks, of base metal; parts thereof of base metal",
        ),
        ("83", "Miscellaneous articles of base metal"),
    ],
    &[
        ("84", "Nuclear reactors, boilers, machinery and mechanical appliances; parts thereof"),
        (
            "85",
            "Electrical machinery and equipment and parts thereof; sound recorders and reproducers, television image and sound recorders and reproducers, and parts and accessories of such articles",
        ),
    ],
    &[
        (
            "86",
            "Railway or tramway locomotives, rolling-stock and parts thereof; railway or tramway track fixtures and fittings and parts thereof; mechanical (including electro-mechanical) traffic signalling equipment of all kinds",
        ),
        (
            "87",
            "Vehicles other than railway or tramway rolling-stock, and parts and accessories thereof",
        ),
        ("88", "Aircraft, spacecraft, and parts thereof"),
        ("89", "Ships, boats and floating structures"),
    ],
    &[
        (
            "90",
            "Optical, photographic, cinematographic, measuring, checking, precision, medical or surgical instruments and apparatus; parts and accessories thereof",
        ),
        ("91", "Clocks and watches and parts thereof"),
        ("92", "Musical instruments; parts and accessories of such articles"),
    ],
    &[
        ("93", "Arms and ammunition; parts and accessories thereof"),
        (
            "94",
            "Furniture; bedding, mattresses, mattress supports, cushions and similar stuffed furnishings; lamps and lighting fittings, not elsewhere specified or included; illuminated signs, illuminated name-plates and the like; prefabricated buildings",
        ),
        ("95", "Toys, games and sports requisites; parts and accessories thereof"),
        ("96", "Miscellaneous manufactured articles"),
        ("97", "Works of art, collectors' pieces and antiques"),
    ],
];

/// The 15 section labels, always in the same order.
pub fn section_candidates() -> &'static [&'static str] {
    &SECTIONS
}

/// Chapter labels under a section, in chapter-code order.
///
/// Matching is exact (case-sensitive). Unknown sections yield an empty list.
pub fn chapters_of(section_label: &str) -> Vec<&'static str> {
    SECTIONS
        .iter()
        .position(|s| *s == section_label)
        .map(|idx| CHAPTERS[idx].iter().map(|(_, label)| *label).collect())
        .unwrap_or_default()
}

/// 2-digit code of a chapter label, or [`UNKNOWN_CHAPTER`] if unmapped.
pub fn code_to_two_digit(chapter_label: &str) -> String {
    all_chapters()
        .find(|(_, label)| *label == chapter_label)
        .map(|(code, _)| code)
        .unwrap_or(UNKNOWN_CHAPTER)
        .to_string()
}

/// Label of a chapter by its 2-digit code.
pub fn chapter_label(two_digit: &str) -> Option<&'static str> {
    all_chapters()
        .find(|(code, _)| *code == two_digit)
        .map(|(_, label)| label)
}

/// Section label owning a 2-digit chapter code.
pub fn section_of_chapter(two_digit: &str) -> Option<&'static str> {
    CHAPTERS
        .iter()
        .position(|chapters| chapters.iter().any(|(code, _)| *code == two_digit))
        .map(|idx| SECTIONS[idx])
}

fn all_chapters() -> impl Iterator<Item = (&'static str, &'static str)> {
    CHAPTERS.iter().flat_map(|chapters| chapters.iter().copied())
}
